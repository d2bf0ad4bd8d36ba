//! The registry of entities taking part in one contest.
//!
//! An event may only reference entities registered here. The roster also
//! fixes each player's team and the starting lineups, which seed the
//! `on_court` flags before the first substitution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use boxscore_types::{ContestId, EntityId, EntityKind};

/// Errors raised while building a roster.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Home and away must be different teams.
    #[error("contest {contest_id}: home and away team are both {team_id}")]
    SameTeam {
        /// The contest.
        contest_id: ContestId,
        /// The duplicated team.
        team_id: EntityId,
    },

    /// A player was assigned to a team that is not playing.
    #[error("contest {contest_id}: player {player_id} assigned to unknown team {team_id}")]
    UnknownTeam {
        /// The contest.
        contest_id: ContestId,
        /// The player.
        player_id: EntityId,
        /// The team named for the player.
        team_id: EntityId,
    },

    /// The same id was registered twice.
    #[error("contest {contest_id}: entity {entity_id} registered twice")]
    Duplicate {
        /// The contest.
        contest_id: ContestId,
        /// The repeated id.
        entity_id: EntityId,
    },

    /// The roster document is not valid JSON.
    #[error("malformed roster document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One player line in a roster document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    /// The player.
    pub entity_id: EntityId,
    /// The player's team for this contest.
    pub team_id: EntityId,
    /// Whether the player starts on court.
    #[serde(default)]
    pub starter: bool,
}

/// The roster document delivered alongside a contest's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDocument {
    /// The contest.
    pub contest_id: ContestId,
    /// Home team.
    pub home_team: EntityId,
    /// Away team.
    pub away_team: EntityId,
    /// Every player dressed for the contest.
    #[serde(default)]
    pub players: Vec<PlayerEntry>,
}

/// Registered entities for one contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestRoster {
    contest_id: ContestId,
    home_team: EntityId,
    away_team: EntityId,
    /// Player id to (team id, starter).
    players: BTreeMap<EntityId, (EntityId, bool)>,
}

impl ContestRoster {
    /// Create a roster with two teams and no players.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::SameTeam`] if both teams are the same.
    pub fn new(
        contest_id: ContestId,
        home_team: EntityId,
        away_team: EntityId,
    ) -> Result<Self, RosterError> {
        if home_team == away_team {
            return Err(RosterError::SameTeam {
                contest_id,
                team_id: home_team,
            });
        }
        Ok(Self {
            contest_id,
            home_team,
            away_team,
            players: BTreeMap::new(),
        })
    }

    /// Register a player.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::UnknownTeam`] if `team_id` is not one of the two
    /// teams, or [`RosterError::Duplicate`] if the id is already registered.
    pub fn with_player(
        mut self,
        player_id: EntityId,
        team_id: EntityId,
        starter: bool,
    ) -> Result<Self, RosterError> {
        if team_id != self.home_team && team_id != self.away_team {
            return Err(RosterError::UnknownTeam {
                contest_id: self.contest_id,
                player_id,
                team_id,
            });
        }
        if self.is_registered(&player_id) {
            return Err(RosterError::Duplicate {
                contest_id: self.contest_id,
                entity_id: player_id,
            });
        }
        self.players.insert(player_id, (team_id, starter));
        Ok(self)
    }

    /// Build a roster from its document form.
    ///
    /// # Errors
    ///
    /// Returns any [`RosterError`] raised while registering the entries.
    pub fn from_document(doc: RosterDocument) -> Result<Self, RosterError> {
        doc.players.into_iter().try_fold(
            Self::new(doc.contest_id, doc.home_team, doc.away_team)?,
            |roster, entry| roster.with_player(entry.entity_id, entry.team_id, entry.starter),
        )
    }

    /// Parse and build a roster from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Json`] for malformed input, or any
    /// registration error.
    pub fn from_json(json: &str) -> Result<Self, RosterError> {
        let doc: RosterDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// The contest this roster belongs to.
    pub const fn contest_id(&self) -> &ContestId {
        &self.contest_id
    }

    /// Whether `entity_id` is a team or player in this contest.
    pub fn is_registered(&self, entity_id: &EntityId) -> bool {
        self.kind_of(entity_id).is_some()
    }

    /// Whether `entity_id` is a player or a team, if registered.
    pub fn kind_of(&self, entity_id: &EntityId) -> Option<EntityKind> {
        if *entity_id == self.home_team || *entity_id == self.away_team {
            Some(EntityKind::Team)
        } else if self.players.contains_key(entity_id) {
            Some(EntityKind::Player)
        } else {
            None
        }
    }

    /// The team a player belongs to (a team maps to itself).
    pub fn team_of(&self, entity_id: &EntityId) -> Option<&EntityId> {
        match self.kind_of(entity_id)? {
            EntityKind::Team => {
                if *entity_id == self.home_team {
                    Some(&self.home_team)
                } else {
                    Some(&self.away_team)
                }
            }
            EntityKind::Player => self.players.get(entity_id).map(|(team, _)| team),
        }
    }

    /// The other team in the contest.
    pub fn opponent_of(&self, team_id: &EntityId) -> Option<&EntityId> {
        if *team_id == self.home_team {
            Some(&self.away_team)
        } else if *team_id == self.away_team {
            Some(&self.home_team)
        } else {
            None
        }
    }

    /// Whether a player starts on court. Teams are always on court.
    pub fn starts_on_court(&self, entity_id: &EntityId) -> bool {
        match self.kind_of(entity_id) {
            Some(EntityKind::Team) => true,
            Some(EntityKind::Player) => self
                .players
                .get(entity_id)
                .is_some_and(|(_, starter)| *starter),
            None => false,
        }
    }

    /// Every registered entity with its kind: both teams, then players.
    pub fn entities(&self) -> impl Iterator<Item = (&EntityId, EntityKind)> {
        [&self.home_team, &self.away_team]
            .into_iter()
            .map(|team| (team, EntityKind::Team))
            .chain(self.players.keys().map(|id| (id, EntityKind::Player)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn roster() -> ContestRoster {
        ContestRoster::new(ContestId::new("G1"), EntityId::new("BOS"), EntityId::new("NYK"))
            .unwrap()
            .with_player(EntityId::new("P1"), EntityId::new("BOS"), true)
            .unwrap()
            .with_player(EntityId::new("P2"), EntityId::new("NYK"), false)
            .unwrap()
    }

    #[test]
    fn kinds_and_teams_resolve() {
        let r = roster();
        assert_eq!(r.kind_of(&EntityId::new("BOS")), Some(EntityKind::Team));
        assert_eq!(r.kind_of(&EntityId::new("P1")), Some(EntityKind::Player));
        assert_eq!(r.kind_of(&EntityId::new("P9")), None);
        assert_eq!(r.team_of(&EntityId::new("P2")), Some(&EntityId::new("NYK")));
        assert_eq!(
            r.opponent_of(&EntityId::new("NYK")),
            Some(&EntityId::new("BOS"))
        );
    }

    #[test]
    fn starters_and_teams_start_on_court() {
        let r = roster();
        assert!(r.starts_on_court(&EntityId::new("P1")));
        assert!(!r.starts_on_court(&EntityId::new("P2")));
        assert!(r.starts_on_court(&EntityId::new("NYK")));
    }

    #[test]
    fn player_on_foreign_team_is_rejected() {
        let result = roster().with_player(EntityId::new("P3"), EntityId::new("LAL"), false);
        assert!(matches!(result, Err(RosterError::UnknownTeam { .. })));
    }

    #[test]
    fn duplicate_player_is_rejected() {
        let result = roster().with_player(EntityId::new("P1"), EntityId::new("BOS"), false);
        assert!(matches!(result, Err(RosterError::Duplicate { .. })));
    }

    #[test]
    fn same_home_and_away_is_rejected() {
        let result =
            ContestRoster::new(ContestId::new("G1"), EntityId::new("BOS"), EntityId::new("BOS"));
        assert!(matches!(result, Err(RosterError::SameTeam { .. })));
    }

    #[test]
    fn roster_parses_from_json() {
        let json = r#"{"contest_id":"G1","home_team":"BOS","away_team":"NYK",
            "players":[{"entity_id":"P1","team_id":"BOS","starter":true},
                       {"entity_id":"P2","team_id":"NYK"}]}"#;
        let r = ContestRoster::from_json(json).unwrap();
        assert_eq!(r.entities().count(), 4);
        assert!(!r.starts_on_court(&EntityId::new("P2")));
    }
}
