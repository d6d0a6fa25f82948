//! Built-in games and the profile used when nothing has been saved yet.

use once_cell::sync::Lazy;
use reqwest::Url;

use crate::{
    content::{AppId, GameContent, SETTINGS_APP_ID},
    models::{Game, Profile, UserIcon},
};

/// Browser identity of the console's web applet.
pub const NINTENDO_SWITCH_USER_AGENT: &str = "Mozilla/5.0 (Nintendo Switch; WebApplet) AppleWebKit/609.4 (KHTML, like Gecko) NF/6.0.2.20.5 NintendoBrowser/5.1.0.22023 Dalvik/2.1.0 (Linux; U; Android 5.1.1; AEOBC Build/LVY48f)";

/// Name of the seeded default profile.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

const STORE_ICON: &str =
    "https://github.com/timi2506/RAW-files-i-need-for-stuff/blob/main/Store.png?raw=true";
const SETTINGS_ICON: &str = "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcTKbVH43z9uLGoXnokhT1dPtD1huxuzNGo_g3GRK7uzJGPDdtHN9_Kwc6nXWoN2tTneYis&usqp=CAU";
const YOUTUBE_TV_ICON: &str =
    "https://github.com/timi2506/RAW-files-i-need-for-stuff/blob/main/YouTube%20TV.png?raw=true";
const CONTROLLER_TEST_ICON: &str =
    "https://static-00.iconduck.com/assets.00/console-controller-icon-2048x2048-pmmusn7m.png";
const DEFAULT_USER_ICON: &str = "https://cdn.accounts.nintendo.com/icons/v1/5cc02a33-f5d1-48e4-b14b-7dd6a5eddb90.png?width=270&bgColor=DFDFDFFF";

static DEFAULT_PROFILE: Lazy<Profile> = Lazy::new(|| {
    Profile::new(
        DEFAULT_PROFILE_NAME,
        vec![
            Game::new(
                builtin_url(YOUTUBE_TV_ICON),
                "YouTube TV",
                Some(GameContent::Url(builtin_url("https://youtube.com/tv"))),
            )
            .with_user_agent(NINTENDO_SWITCH_USER_AGENT),
            Game::new(
                builtin_url(CONTROLLER_TEST_ICON),
                "Controller Test",
                Some(GameContent::Url(builtin_url("https://gpadtester.com"))),
            )
            .with_user_agent(NINTENDO_SWITCH_USER_AGENT),
            store_game(),
        ],
        UserIcon::Url(builtin_url(DEFAULT_USER_ICON)),
    )
});

fn builtin_url(raw: &str) -> Url {
    Url::parse(raw).expect("built-in URL is valid")
}

/// The profile seeded on first launch and after a reset.
///
/// Created once per process, so every call returns an equal value.
pub fn default_profile() -> Profile {
    DEFAULT_PROFILE.clone()
}

/// A fresh store entry.
pub fn store_game() -> Game {
    Game::new(builtin_url(STORE_ICON), "Store", Some(GameContent::store()))
}

/// A fresh settings entry.
pub fn settings_game() -> Game {
    Game::new(
        builtin_url(SETTINGS_ICON),
        "Settings",
        Some(GameContent::InternalView(AppId::new(SETTINGS_APP_ID))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_stable() {
        let first = default_profile();
        let second = default_profile();
        assert_eq!(first, second);
        assert_eq!(first.name, "Default");
        let names: Vec<_> = first.games.iter().map(|game| game.name.as_str()).collect();
        assert_eq!(names, ["YouTube TV", "Controller Test", "Store"]);
        assert!(first.has_store());
        assert_eq!(
            first.games[0].user_agent.as_deref(),
            Some(NINTENDO_SWITCH_USER_AGENT)
        );
    }

    #[test]
    fn builtin_entries_get_fresh_ids() {
        assert_ne!(store_game().id, store_game().id);
        assert!(store_game().is_store());
        assert!(!settings_game().is_store());
    }
}
