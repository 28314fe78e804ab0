use serde::Serialize;
use serde_json::{Map, Value};

/// A game as seen by the search core.
///
/// Only the two team codes are interpreted. Flat code fields are replaced by
/// `home`/`away`; nested team objects and every other field the provider sent
/// stay in `details` untouched. A provider field named `home` or `away` is
/// kept as `providerHome`/`providerAway` so the output has no duplicate keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub home: String,
    pub away: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Keys that may carry a team, in lookup order: legacy flat codes first,
/// then the `homeTeam`/`awayTeam` form which may be flat or nested.
const HOME_KEYS: [&str; 2] = ["hTeam", "homeTeam"];
const AWAY_KEYS: [&str; 2] = ["vTeam", "awayTeam"];

impl Game {
    pub fn new(home: &str, away: &str) -> Self {
        Game {
            home: home.to_string(),
            away: away.to_string(),
            details: Map::new(),
        }
    }

    /// Normalize a raw provider record. Returns `None` when either side has
    /// no recognizable team code.
    pub fn from_raw(raw: Value) -> Option<Game> {
        let Value::Object(mut details) = raw else {
            return None;
        };
        let home = take_team(&mut details, &HOME_KEYS)?;
        let away = take_team(&mut details, &AWAY_KEYS)?;
        for (key, renamed) in [("home", "providerHome"), ("away", "providerAway")] {
            if let Some(value) = details.remove(key) {
                details.insert(renamed.to_string(), value);
            }
        }
        Some(Game {
            home,
            away,
            details,
        })
    }

    /// Whether the home or away side is one of `teams`.
    pub fn involves_any(&self, teams: &[String]) -> bool {
        teams
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.home) || t.eq_ignore_ascii_case(&self.away))
    }
}

/// Read the first usable team code. A flat string field is consumed; a
/// nested team object stays in the record.
fn take_team(record: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let (key, code) = keys
        .iter()
        .find_map(|key| team_code(record.get(*key)).map(|code| (*key, code)))?;
    if record.get(key).is_some_and(Value::is_string) {
        record.remove(key);
    }
    Some(code)
}

fn team_code(value: Option<&Value>) -> Option<String> {
    let code = match value? {
        Value::String(code) => code.as_str(),
        Value::Object(team) => team.get("abbreviation")?.as_str()?,
        _ => return None,
    };
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

/// Keep only the games that involve one of `teams`.
pub fn filter_to_teams(games: &[Game], teams: &[String]) -> Vec<Game> {
    games
        .iter()
        .filter(|g| g.involves_any(teams))
        .cloned()
        .collect()
}
