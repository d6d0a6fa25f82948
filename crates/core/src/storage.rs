//! Profile collection with write-through persistence.
//!
//! [`SwitchStorage`] is a cheap-to-clone handle around the profile list and the
//! selected profile. Every change to the list goes through one commit path that
//! runs [`repair`] and then writes the whole collection under
//! [`PROFILE_DATA_KEY`]. The commit happens under a write lock, so concurrent
//! read-modify-write callers cannot lose each other's updates.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    defaults::{default_profile, store_game},
    error::{DecodeError, DuplicateError, PersistenceError, StorageError},
    models::{Game, Profile, UserIcon},
    persistence::KeyValueStore,
    transfer::ImportReport,
};

/// Key under which the profile array is stored.
pub const PROFILE_DATA_KEY: &str = "profileData";

/// Restore the collection invariants after a mutation.
///
/// An empty collection is re-seeded with the default profile. Each profile ends
/// up with exactly one store entry, appended if missing. The selection is kept
/// only if an equal profile is still present, otherwise it resets to the first
/// profile.
pub fn repair(mut profiles: Vec<Profile>, selected: Profile) -> (Vec<Profile>, Profile) {
    if profiles.is_empty() {
        warn!("profile collection is empty; seeding the default profile");
        profiles.push(default_profile());
    }

    for profile in &mut profiles {
        ensure_single_store(profile);
    }

    let selected = if profiles.contains(&selected) {
        selected
    } else {
        // Non-empty after the re-seed above.
        profiles[0].clone()
    };

    (profiles, selected)
}

fn ensure_single_store(profile: &mut Profile) {
    let mut seen = false;
    profile.games.retain(|game| {
        if !game.is_store() {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    if !seen {
        debug!("adding store entry to profile {}", profile.name);
        profile.games.push(store_game());
    }
}

/// Outcome of [`SwitchStorage::remove_games`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Number of games removed, not counting a restored store entry.
    pub removed: usize,
    /// The store entry was among the removed games and has been put back.
    pub store_protected: bool,
    /// Requested ids that matched no game of the profile.
    pub missing: Vec<Uuid>,
}

struct Inner {
    profiles: Vec<Profile>,
    selected: Profile,
}

/// Shared handle to the profile collection.
pub struct SwitchStorage<S> {
    store: Arc<S>,
    inner: Arc<RwLock<Inner>>,
}

impl<S> Clone for SwitchStorage<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> SwitchStorage<S> {
    /// Load the persisted collection, falling back to the default profile.
    ///
    /// Missing or unreadable data is logged, never returned as an error.
    pub fn initialize(store: S) -> Self {
        let (profiles, selected) = match load_profiles(&store) {
            Ok(Some(profiles)) => {
                info!("Loaded {} saved profile(s)", profiles.len());
                let selected = profiles.first().cloned().unwrap_or_else(default_profile);
                repair(profiles, selected)
            }
            Ok(None) => {
                info!("No saved profiles; loaded default profiles");
                (vec![default_profile()], default_profile())
            }
            Err(err) => {
                warn!("Failed to load saved profiles, loaded default profiles: {err}");
                (vec![default_profile()], default_profile())
            }
        };

        Self {
            store: Arc::new(store),
            inner: Arc::new(RwLock::new(Inner { profiles, selected })),
        }
    }

    /// Snapshot of all profiles.
    pub fn profiles(&self) -> Vec<Profile> {
        self.inner.read().profiles.clone()
    }

    /// Snapshot of the selected profile.
    pub fn selected_profile(&self) -> Profile {
        self.inner.read().selected.clone()
    }

    /// Snapshot of the profile with the given id.
    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.inner
            .read()
            .profiles
            .iter()
            .find(|profile| profile.id == id)
            .cloned()
    }

    /// Replace the whole collection, repair it and persist it.
    ///
    /// The in-memory state is updated even when the write fails.
    pub fn set_profiles(&self, profiles: Vec<Profile>) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write();
        self.commit(&mut inner, profiles)
    }

    /// Change the selection without repairing or persisting anything.
    pub fn set_selected_profile(&self, profile: Profile) {
        let mut inner = self.inner.write();
        if !inner.profiles.contains(&profile) {
            debug!("selected profile {} is not in the collection", profile.name);
        }
        inner.selected = profile;
    }

    /// Select the stored profile with the given id.
    pub fn select(&self, id: Uuid) -> Result<Profile, StorageError> {
        let profile = self.profile(id).ok_or(StorageError::UnknownProfile(id))?;
        self.set_selected_profile(profile.clone());
        Ok(profile)
    }

    /// Run `f` on a copy of the collection and commit the result if it succeeds.
    ///
    /// The read, the change and the write form one critical section.
    pub fn update_profiles<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Vec<Profile>) -> Result<T, StorageError>,
    {
        let mut inner = self.inner.write();
        let mut profiles = inner.profiles.clone();
        let value = f(&mut profiles)?;
        self.commit(&mut inner, profiles)?;
        Ok(value)
    }

    /// Append a new profile that only holds the store entry.
    pub fn add_user(
        &self,
        name: impl Into<String>,
        icon: Vec<u8>,
    ) -> Result<Profile, PersistenceError> {
        let profile = Profile::new(name, vec![store_game()], UserIcon::Data(icon));
        let mut inner = self.inner.write();
        let mut profiles = inner.profiles.clone();
        profiles.push(profile.clone());
        self.commit(&mut inner, profiles)?;
        Ok(profile)
    }

    /// Replace everything with the default profile and select it.
    pub fn reset(&self) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write();
        inner.selected = default_profile();
        self.commit(&mut inner, vec![default_profile()])?;
        info!("Reset data");
        Ok(())
    }

    /// Append `game` to a profile unless a game with the same content exists.
    pub fn install_game(&self, profile_id: Uuid, game: Game) -> Result<(), StorageError> {
        self.update_profiles(|profiles| {
            let profile = find_mut(profiles, profile_id)?;
            if profile.contains_content(&game) {
                return Err(DuplicateError {
                    name: game.name.clone(),
                    profile: profile.name.clone(),
                }
                .into());
            }
            info!("Installing {} for {}", game.name, profile.name);
            profile.games.push(game);
            Ok(())
        })
    }

    /// Append every game whose content is new to the profile, counting skips.
    pub fn import_games(
        &self,
        profile_id: Uuid,
        games: Vec<Game>,
    ) -> Result<ImportReport, StorageError> {
        self.update_profiles(|profiles| {
            let profile = find_mut(profiles, profile_id)?;
            let mut report = ImportReport::default();
            for game in games {
                if profile.contains_content(&game) {
                    report.skipped += 1;
                } else {
                    profile.games.push(game);
                    report.imported += 1;
                }
            }
            info!(
                "Imported {} game(s) into {}, skipped {} duplicate(s)",
                report.imported, profile.name, report.skipped
            );
            Ok(report)
        })
    }

    /// Remove games by id. A removed store entry is restored by the repair pass.
    pub fn remove_games(
        &self,
        profile_id: Uuid,
        game_ids: &[Uuid],
    ) -> Result<RemovalReport, StorageError> {
        self.update_profiles(|profiles| {
            let profile = find_mut(profiles, profile_id)?;
            let mut report = RemovalReport {
                missing: game_ids
                    .iter()
                    .filter(|id| !profile.games.iter().any(|game| game.id == **id))
                    .copied()
                    .collect(),
                ..RemovalReport::default()
            };
            if !report.missing.is_empty() {
                warn!(
                    "{} game id(s) not found in {}",
                    report.missing.len(),
                    profile.name
                );
            }
            profile.games.retain(|game| {
                if !game_ids.contains(&game.id) {
                    return true;
                }
                if game.is_store() {
                    report.store_protected = true;
                } else {
                    report.removed += 1;
                }
                false
            });
            if report.store_protected {
                warn!("The store entry of {} can't be removed", profile.name);
            }
            Ok(report)
        })
    }

    fn commit(&self, inner: &mut Inner, profiles: Vec<Profile>) -> Result<(), PersistenceError> {
        let (profiles, selected) = repair(profiles, inner.selected.clone());
        inner.profiles = profiles;
        inner.selected = selected;

        let bytes =
            serde_json::to_vec(&inner.profiles).map_err(|source| PersistenceError::Serialize {
                key: PROFILE_DATA_KEY.to_string(),
                source,
            })?;
        self.store.set(PROFILE_DATA_KEY, &bytes)?;
        info!("Saved {} profile(s)", inner.profiles.len());
        Ok(())
    }
}

fn load_profiles<S: KeyValueStore>(store: &S) -> anyhow::Result<Option<Vec<Profile>>> {
    let Some(bytes) = store.get(PROFILE_DATA_KEY)? else {
        return Ok(None);
    };
    let profiles = serde_json::from_slice(&bytes)
        .map_err(|err| DecodeError::new("saved profiles", err))?;
    Ok(Some(profiles))
}

fn find_mut(profiles: &mut [Profile], id: Uuid) -> Result<&mut Profile, StorageError> {
    profiles
        .iter_mut()
        .find(|profile| profile.id == id)
        .ok_or(StorageError::UnknownProfile(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::GameContent,
        defaults::settings_game,
        persistence::{FileStore, MemoryStore},
    };
    use anyhow::Result;
    use reqwest::Url;
    use std::thread;
    use tempfile::tempdir;

    fn web_game(name: &str, url: &str) -> Game {
        Game::new(
            Url::parse("https://example.com/icon.png").unwrap(),
            name,
            Some(GameContent::Url(Url::parse(url).unwrap())),
        )
    }

    fn store_count(profile: &Profile) -> usize {
        profile.games.iter().filter(|game| game.is_store()).count()
    }

    fn saved(store: &MemoryStore) -> Vec<Profile> {
        let bytes = store.get(PROFILE_DATA_KEY).unwrap().expect("profiles saved");
        serde_json::from_slice(&bytes).unwrap()
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &[u8]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn repair_backfills_store_once() {
        let mut bare = default_profile();
        bare.games.retain(|game| !game.is_store());
        let mut doubled = Profile::new(
            "Twice",
            vec![store_game(), store_game()],
            bare.user_icon.clone(),
        );
        doubled.games.insert(1, settings_game());

        let (profiles, _) = repair(vec![bare.clone(), doubled], bare);
        assert!(profiles.iter().all(|profile| store_count(profile) == 1));
        assert_eq!(profiles[1].games.len(), 2);
        assert!(profiles[0].games.last().unwrap().is_store());

        let (again, _) = repair(profiles.clone(), profiles[0].clone());
        assert_eq!(again, profiles);
    }

    #[test]
    fn repair_repoints_selection() {
        let first = default_profile();
        let second = Profile::new("Second", vec![store_game()], first.user_icon.clone());

        let gone = Profile::new("Gone", vec![], first.user_icon.clone());
        let (profiles, selected) = repair(vec![first.clone(), second.clone()], gone);
        assert_eq!(selected, profiles[0]);

        let (profiles, selected) = repair(vec![first.clone(), second.clone()], second.clone());
        assert_eq!(selected, profiles[1]);

        let mut edited = second.clone();
        edited.games.insert(0, web_game("New", "https://example.com/new"));
        let (profiles, selected) = repair(vec![first.clone(), edited], second);
        assert_eq!(selected, profiles[0]);
        assert_eq!(selected, first);

        let (profiles, selected) = repair(Vec::new(), first);
        assert_eq!(profiles, vec![default_profile()]);
        assert_eq!(selected, default_profile());
    }

    #[test]
    fn initialize_seeds_default_when_nothing_saved() {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let profiles = storage.profiles();
        assert_eq!(profiles, vec![default_profile()]);
        assert_eq!(storage.selected_profile(), default_profile());
    }

    #[test]
    fn initialize_ignores_corrupt_data() -> Result<()> {
        let store = MemoryStore::new();
        store.set(PROFILE_DATA_KEY, b"{not json")?;
        let storage = SwitchStorage::initialize(store);
        assert_eq!(storage.profiles(), vec![default_profile()]);
        Ok(())
    }

    #[test]
    fn initialize_with_empty_array_seeds_default() -> Result<()> {
        let store = MemoryStore::new();
        store.set(PROFILE_DATA_KEY, b"[]")?;
        let storage = SwitchStorage::initialize(store);
        assert_eq!(storage.profiles(), vec![default_profile()]);
        assert_eq!(storage.selected_profile(), default_profile());
        Ok(())
    }

    #[test]
    fn initialize_repairs_without_writing_back() -> Result<()> {
        let mut bare = default_profile();
        bare.games.retain(|game| !game.is_store());
        let bytes = serde_json::to_vec(&vec![bare])?;
        let store = Arc::new(MemoryStore::new());
        store.set(PROFILE_DATA_KEY, &bytes)?;

        let storage = SwitchStorage::initialize(Arc::clone(&store));
        let profiles = storage.profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(store_count(&profiles[0]), 1);
        assert_eq!(storage.selected_profile(), profiles[0]);
        assert_eq!(store.get(PROFILE_DATA_KEY)?, Some(bytes));
        Ok(())
    }

    #[test]
    fn edited_selection_resets_to_first_profile() -> Result<()> {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let alice = storage.add_user("Alice", vec![1])?;
        storage.select(alice.id)?;
        assert_eq!(storage.selected_profile(), alice);

        storage.install_game(alice.id, web_game("Chirp", "https://beta.chirpsocial.net"))?;
        let profiles = storage.profiles();
        assert_eq!(profiles[1].games.len(), 2);
        assert_eq!(storage.selected_profile(), profiles[0]);
        Ok(())
    }

    #[test]
    fn add_user_then_reset() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = SwitchStorage::initialize(Arc::clone(&store));

        let profiles = storage.profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "Default");
        let names: Vec<_> = profiles[0].games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["YouTube TV", "Controller Test", "Store"]);

        let alice = storage.add_user("Alice", vec![0x89, 0x50, 0x4e, 0x47])?;
        let profiles = storage.profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].name, "Alice");
        assert_eq!(profiles[1].games.len(), 1);
        assert!(profiles[1].games[0].is_store());
        assert_eq!(profiles[1], alice);
        assert_eq!(saved(&store), profiles);

        storage.select(alice.id)?;
        storage.reset()?;
        assert_eq!(storage.profiles(), vec![default_profile()]);
        assert_eq!(storage.selected_profile(), default_profile());
        assert_eq!(saved(&store), vec![default_profile()]);
        Ok(())
    }

    #[test]
    fn saved_profiles_survive_restart() -> Result<()> {
        let dir = tempdir()?;
        let storage = SwitchStorage::initialize(FileStore::new(dir.path()));
        storage.add_user("Bob", vec![1, 2, 3])?;
        let before = storage.profiles();

        let reloaded = SwitchStorage::initialize(FileStore::new(dir.path()));
        assert_eq!(reloaded.profiles(), before);
        assert_eq!(reloaded.selected_profile(), before[0]);
        Ok(())
    }

    #[test]
    fn set_profiles_repairs_before_saving() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = SwitchStorage::initialize(Arc::clone(&store));
        let mut profiles = storage.profiles();
        profiles[0].games.clear();

        storage.set_profiles(profiles.clone())?;
        storage.set_profiles(storage.profiles())?;
        let current = storage.profiles();
        assert_eq!(current[0].games.len(), 1);
        assert_eq!(store_count(&current[0]), 1);
        assert_eq!(saved(&store), current);
        assert_eq!(storage.selected_profile(), current[0]);
        Ok(())
    }

    #[test]
    fn selection_is_not_persisted() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let storage = SwitchStorage::initialize(Arc::clone(&store));
        let bob = storage.add_user("Bob", vec![7])?;
        let bytes = store.get(PROFILE_DATA_KEY)?;

        storage.set_selected_profile(bob.clone());
        assert_eq!(storage.selected_profile(), bob);
        assert_eq!(store.get(PROFILE_DATA_KEY)?, bytes);
        assert!(matches!(
            storage.select(Uuid::new_v4()),
            Err(StorageError::UnknownProfile(_))
        ));
        Ok(())
    }

    #[test]
    fn install_skips_duplicate_content() -> Result<()> {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let id = storage.selected_profile().id;

        let game = web_game("Chirp", "https://beta.chirpsocial.net");
        storage.install_game(id, game.clone())?;
        assert_eq!(storage.profile(id).unwrap().games.len(), 4);

        let renamed = Game {
            id: Uuid::new_v4(),
            name: "Chirp again".into(),
            ..game
        };
        let err = storage.install_game(id, renamed).unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));
        assert_eq!(storage.profile(id).unwrap().games.len(), 4);
        Ok(())
    }

    #[test]
    fn import_counts_new_and_skipped_games() -> Result<()> {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let id = storage.selected_profile().id;
        let batch = vec![
            web_game("YouTube copy", "https://youtube.com/tv"),
            web_game("Chirp", "https://beta.chirpsocial.net"),
            web_game("Chirp twin", "https://beta.chirpsocial.net"),
            store_game(),
        ];

        let report = storage.import_games(id, batch)?;
        assert_eq!(report, ImportReport { imported: 1, skipped: 3 });
        assert_eq!(storage.profile(id).unwrap().games.len(), 4);
        Ok(())
    }

    #[test]
    fn store_entry_is_restored_after_removal() -> Result<()> {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let profile = storage.selected_profile();
        let ids: Vec<_> = profile.games.iter().map(|game| game.id).collect();

        let report = storage.remove_games(profile.id, &ids)?;
        assert_eq!(
            report,
            RemovalReport {
                removed: 2,
                store_protected: true,
                missing: Vec::new(),
            }
        );
        let games = storage.profile(profile.id).unwrap().games;
        assert_eq!(games.len(), 1);
        assert!(games[0].is_store());
        Ok(())
    }

    #[test]
    fn unknown_ids_are_reported_on_removal() -> Result<()> {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let profile = storage.selected_profile();
        let stale = Uuid::new_v4();

        let report = storage.remove_games(profile.id, &[profile.games[0].id, stale])?;
        assert_eq!(report.removed, 1);
        assert_eq!(report.missing, vec![stale]);
        assert_eq!(storage.profile(profile.id).unwrap().games.len(), 2);
        Ok(())
    }

    #[test]
    fn write_failure_still_commits_in_memory() {
        let storage = SwitchStorage::initialize(FailingStore);
        let err = storage.add_user("Carol", vec![1]).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(storage.profiles().len(), 2);
    }

    #[test]
    fn concurrent_installs_are_not_lost() {
        let storage = SwitchStorage::initialize(MemoryStore::new());
        let id = storage.selected_profile().id;

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let storage = storage.clone();
                thread::spawn(move || {
                    let game = web_game(&format!("Game {n}"), &format!("https://example.com/{n}"));
                    storage.install_game(id, game).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.profile(id).unwrap().games.len(), 3 + 8);
    }
}
