//! One player's attempt record for one calendar day.
//!
//! `InProgress -> Won | Lost`, nothing else. Attempts used is the length of the
//! guess list, so the two can never disagree.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{GameError, GameResult};
use crate::types::{GuessRecord, HintVector, Outcome, Symbol, TerminalResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    player_id: String,
    day: NaiveDate,
    secret: Symbol,
    /// Oldest first.
    guesses: Vec<GuessRecord>,
    max_attempts: u32,
    outcome: Outcome,
}

/// What a caller learns from one accepted guess.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessOutcome {
    pub outcome: Outcome,
    pub hints: HintVector,
    pub attempts_remaining: u32,
    /// Present only when `outcome` is terminal.
    pub terminal: Option<TerminalResult>,
}

impl Session {
    pub fn new(player_id: impl Into<String>, day: NaiveDate, secret: Symbol, max_attempts: u32) -> Self {
        Self {
            player_id: player_id.into(),
            day,
            secret,
            guesses: Vec::new(),
            max_attempts: max_attempts.max(1),
            outcome: Outcome::InProgress,
        }
    }

    /// Rebuild a persisted session, rejecting records that break the invariants.
    pub fn restore(
        player_id: String,
        day: NaiveDate,
        secret: Symbol,
        max_attempts: u32,
        outcome: Outcome,
        guesses: Vec<GuessRecord>,
    ) -> Result<Self, String> {
        if max_attempts == 0 {
            return Err("max_attempts is zero".to_string());
        }
        if guesses.len() > max_attempts as usize {
            return Err(format!("{} guesses exceed max_attempts {max_attempts}", guesses.len()));
        }
        for (i, g) in guesses.iter().enumerate() {
            if g.attempt_index as usize != i + 1 {
                return Err(format!("guess {} has attempt_index {}", i + 1, g.attempt_index));
            }
        }
        if let Some(early) = guesses.iter().rev().skip(1).find(|g| g.ticker == secret) {
            return Err(format!("guess {} hit the secret but is not the last guess", early.attempt_index));
        }
        let hit = guesses.last().is_some_and(|g| g.ticker == secret);
        let consistent = match outcome {
            Outcome::Won => hit,
            Outcome::InProgress => !hit && guesses.len() < max_attempts as usize,
            Outcome::Lost => !hit,
        };
        if !consistent {
            return Err(format!("outcome {outcome} inconsistent with {} guesses", guesses.len()));
        }

        Ok(Self { player_id, day, secret, guesses, max_attempts, outcome })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Hidden from players until the session is terminal.
    pub fn secret(&self) -> &Symbol {
        &self.secret
    }

    pub fn guesses(&self) -> &[GuessRecord] {
        &self.guesses
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts_used(&self) -> u32 {
        self.guesses.len() as u32
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts - self.attempts_used()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn terminal_result(&self) -> Option<TerminalResult> {
        self.is_finished().then(|| TerminalResult {
            win: self.outcome == Outcome::Won,
            total_guesses: self.attempts_used(),
            secret_ticker: self.secret.clone(),
        })
    }

    /// Fails with `SessionAlreadyFinished` (carrying the result) once terminal.
    pub fn ensure_in_progress(&self) -> GameResult<()> {
        match self.terminal_result() {
            Some(result) => Err(GameError::SessionAlreadyFinished(result)),
            None => Ok(()),
        }
    }

    /// Record a guess of an already-resolved ticker together with its hints.
    pub fn submit_guess(&mut self, ticker: Symbol, hints: HintVector) -> GameResult<GuessOutcome> {
        self.ensure_in_progress()?;

        let attempt_index = self.attempts_used() + 1;
        let won = ticker == self.secret;
        self.guesses.push(GuessRecord { ticker, hints: hints.clone(), attempt_index });

        if won {
            self.outcome = Outcome::Won;
        } else if self.attempts_used() >= self.max_attempts {
            self.outcome = Outcome::Lost;
        }

        debug!(
            player_id = %self.player_id,
            day = %self.day,
            attempts_used = self.attempts_used(),
            outcome = %self.outcome,
            "Guess recorded",
        );
        if self.is_finished() {
            info!(player_id = %self.player_id, day = %self.day, outcome = %self.outcome, "Session finished");
        }

        Ok(GuessOutcome {
            outcome: self.outcome,
            hints,
            attempts_remaining: self.attempts_remaining(),
            terminal: self.terminal_result(),
        })
    }

    /// Give up: `InProgress -> Lost`. On a terminal session returns the original result.
    pub fn end(&mut self) -> TerminalResult {
        if !self.is_finished() {
            self.outcome = Outcome::Lost;
            info!(player_id = %self.player_id, day = %self.day, attempts_used = self.attempts_used(), "Session ended by player");
        }
        TerminalResult {
            win: self.outcome == Outcome::Won,
            total_guesses: self.attempts_used(),
            secret_ticker: self.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attribute;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn session(max: u32) -> Session {
        Session::new("p1", day(), sym("AAPL"), max)
    }

    fn far_hint() -> HintVector {
        let mut h = HintVector::default();
        h.insert(Attribute::Price, 0.10);
        h
    }

    #[test]
    fn starts_in_progress_with_no_attempts() {
        let s = session(5);
        assert_eq!(s.outcome(), Outcome::InProgress);
        assert_eq!(s.attempts_used(), 0);
        assert_eq!(s.attempts_remaining(), 5);
        assert!(s.terminal_result().is_none());
    }

    #[test]
    fn wrong_guess_consumes_one_attempt() {
        let mut s = session(5);
        let out = s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        assert_eq!(out.outcome, Outcome::InProgress);
        assert_eq!(out.attempts_remaining, 4);
        assert!(out.terminal.is_none());
        assert_eq!(out.hints, far_hint());
        assert_eq!(s.attempts_used() as usize, s.guesses().len());
        assert_eq!(s.guesses()[0].attempt_index, 1);
    }

    #[test]
    fn correct_guess_wins_and_reveals() {
        let mut s = session(5);
        s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        let out = s.submit_guess(sym("AAPL"), HintVector::default()).unwrap();
        assert_eq!(out.outcome, Outcome::Won);
        let terminal = out.terminal.unwrap();
        assert!(terminal.win);
        assert_eq!(terminal.total_guesses, 2);
        assert_eq!(terminal.secret_ticker, sym("AAPL"));
    }

    #[test]
    fn winning_on_last_attempt_is_a_win() {
        let mut s = session(2);
        s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        let out = s.submit_guess(sym("AAPL"), HintVector::default()).unwrap();
        assert_eq!(out.outcome, Outcome::Won);
    }

    #[test]
    fn max_wrong_guesses_loses_then_rejects() {
        let mut s = session(5);
        for (i, t) in ["MSFT", "GOOG", "AMZN", "NVDA"].iter().enumerate() {
            let out = s.submit_guess(sym(t), far_hint()).unwrap();
            assert_eq!(out.attempts_remaining, 4 - i as u32);
            assert_eq!(out.outcome, Outcome::InProgress);
        }
        let out = s.submit_guess(sym("TSLA"), far_hint()).unwrap();
        assert_eq!(out.outcome, Outcome::Lost);
        assert_eq!(out.attempts_remaining, 0);
        let terminal = out.terminal.unwrap();
        assert!(!terminal.win);
        assert_eq!(terminal.total_guesses, 5);
        assert_eq!(terminal.secret_ticker, sym("AAPL"));

        let err = s.submit_guess(sym("AAPL"), HintVector::default()).unwrap_err();
        assert!(matches!(err, GameError::SessionAlreadyFinished(ref r) if r.total_guesses == 5 && !r.win));
        assert_eq!(s.attempts_used(), 5);
        assert_eq!(s.outcome(), Outcome::Lost);
    }

    #[test]
    fn end_forces_loss_and_is_idempotent() {
        let mut s = session(5);
        s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        let first = s.end();
        assert!(!first.win);
        assert_eq!(first.total_guesses, 1);
        assert_eq!(s.outcome(), Outcome::Lost);
        assert_eq!(s.end(), first);
    }

    #[test]
    fn end_after_win_keeps_win() {
        let mut s = session(5);
        s.submit_guess(sym("AAPL"), HintVector::default()).unwrap();
        let result = s.end();
        assert!(result.win);
        assert_eq!(s.outcome(), Outcome::Won);
    }

    #[test]
    fn restore_round_trips_a_valid_session() {
        let mut s = session(3);
        s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        let restored = Session::restore(
            s.player_id().to_string(),
            s.day(),
            s.secret().clone(),
            s.max_attempts(),
            s.outcome(),
            s.guesses().to_vec(),
        )
        .unwrap();
        assert_eq!(restored, s);
    }

    #[test]
    fn restore_rejects_inconsistent_records() {
        let mut s = session(1);
        s.submit_guess(sym("MSFT"), far_hint()).unwrap();
        let guesses = s.guesses().to_vec();

        // Out of attempts but still in progress.
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 1, Outcome::InProgress, guesses.clone()).is_err());
        // Won without guessing the secret.
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 1, Outcome::Won, guesses.clone()).is_err());
        // More guesses than allowed.
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 0, Outcome::Lost, guesses).is_err());
    }

    #[test]
    fn restore_rejects_secret_hit_before_the_last_guess() {
        let record = |ticker: &str, attempt_index: u32| GuessRecord {
            ticker: sym(ticker),
            hints: HintVector::default(),
            attempt_index,
        };

        let lost = vec![record("AAPL", 1), record("MSFT", 2)];
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 2, Outcome::Lost, lost).is_err());

        let won = vec![record("AAPL", 1), record("AAPL", 2)];
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 5, Outcome::Won, won).is_err());

        let fine = vec![record("MSFT", 1), record("AAPL", 2)];
        assert!(Session::restore("p1".into(), day(), sym("AAPL"), 5, Outcome::Won, fine).is_ok());
    }
}
