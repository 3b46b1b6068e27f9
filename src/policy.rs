//! Move-selection policies
//!
//! A [`MovePolicy`] is handed the current game and its legal moves and picks
//! one of them, or resigns. Agents only ever call [`MovePolicy::choose_move`];
//! which implementation runs is decided by [`PolicyKind`] in configuration.

use chess_engine::{GameState, Move};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::core::{AgentConfig, PolicyKind};

/// What a policy wants to do this ply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Play(Move),
    Resign,
}

/// Chooses one move per ply
pub trait MovePolicy: Send {
    /// Label written to the game record
    fn name(&self) -> &str;

    /// Pick an element of `legal` or resign
    fn choose_move(&mut self, state: &GameState, legal: &[Move]) -> PolicyDecision;
}

/// Uniformly random legal moves
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl MovePolicy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn choose_move(&mut self, _state: &GameState, legal: &[Move]) -> PolicyDecision {
        match legal.choose(&mut self.rng) {
            Some(mv) => PolicyDecision::Play(*mv),
            None => PolicyDecision::Resign,
        }
    }
}

/// Plays a fixed list of moves, then resigns
///
/// A scripted move that is not legal in the current position also resigns.
pub struct ScriptedPolicy {
    moves: VecDeque<String>,
}

impl ScriptedPolicy {
    pub fn new<I, S>(moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            moves: moves.into_iter().map(Into::into).collect(),
        }
    }
}

impl MovePolicy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn choose_move(&mut self, state: &GameState, legal: &[Move]) -> PolicyDecision {
        let Some(text) = self.moves.pop_front() else {
            return PolicyDecision::Resign;
        };
        match state.board().parse_uci(&text) {
            Ok(mv) if legal.iter().any(|m| m.same_coordinates(&mv)) => PolicyDecision::Play(mv),
            _ => PolicyDecision::Resign,
        }
    }
}

/// Build the policy named by an agent's configuration
pub fn policy_from_config(config: &AgentConfig) -> Box<dyn MovePolicy> {
    match config.policy {
        PolicyKind::Random => Box::new(RandomPolicy::new(config.seed)),
        PolicyKind::Scripted => Box::new(ScriptedPolicy::new(config.script.iter().cloned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_policy_plays_a_legal_move() {
        let game = GameState::new("p");
        let legal = game.legal_moves();
        let mut policy = RandomPolicy::new(Some(7));
        match policy.choose_move(&game, &legal) {
            PolicyDecision::Play(mv) => assert!(legal.contains(&mv)),
            PolicyDecision::Resign => panic!("random policy resigned with 20 legal moves"),
        }
    }

    #[test]
    fn test_seeded_random_policy_is_repeatable() {
        let game = GameState::new("p");
        let legal = game.legal_moves();
        let picks = |seed| {
            let mut policy = RandomPolicy::new(Some(seed));
            (0..5)
                .map(|_| policy.choose_move(&game, &legal))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn test_scripted_policy_resigns_when_exhausted() {
        let game = GameState::new("p");
        let legal = game.legal_moves();
        let mut policy = ScriptedPolicy::new(["e2e4"]);
        assert!(matches!(policy.choose_move(&game, &legal), PolicyDecision::Play(_)));
        assert_eq!(policy.choose_move(&game, &legal), PolicyDecision::Resign);
    }

    #[test]
    fn test_scripted_policy_resigns_on_illegal_move() {
        let game = GameState::new("p");
        let legal = game.legal_moves();
        let mut policy = ScriptedPolicy::new(["e2e5"]);
        assert_eq!(policy.choose_move(&game, &legal), PolicyDecision::Resign);
    }

    #[test]
    fn test_policy_from_config_uses_kind() {
        let config = AgentConfig {
            policy: PolicyKind::Scripted,
            ..AgentConfig::default()
        };
        assert_eq!(policy_from_config(&config).name(), "scripted");
        assert_eq!(policy_from_config(&AgentConfig::default()).name(), "random");
    }
}
