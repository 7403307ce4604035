//! One clip at a time: start it, watch it and the input, release it.

use crate::abort::{AbortController, AbortReason, InputEvent, Verdict};
use crate::error::{Error, Result};
use crate::media::VideoFile;
use crate::player::{Player, PlayerState};
use crate::settings::InputAction;
use std::time::Instant;

/// How a playback iteration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stream ran out on its own.
    Ended,
    Aborted(AbortReason),
    /// The clip could not be played.
    Failed(String),
}

/// A player bound to one clip.
///
/// The player is stopped and released exactly once, by [`close`](Self::close)
/// or on drop, whichever comes first.
pub struct PlaybackSession<P: Player> {
    video: VideoFile,
    player: P,
    abort: AbortController,
    running: bool,
    released: bool,
}

impl<P: Player> PlaybackSession<P> {
    pub fn start(video: VideoFile, player: P, abort: AbortController) -> Result<Self> {
        let mut session = Self {
            video,
            player,
            abort,
            running: true,
            released: false,
        };
        session.player.load(&session.video.path)?;
        session.player.play()?;
        Ok(session)
    }

    pub fn video(&self) -> &VideoFile {
        &self.video
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        if let Verdict::Abort(reason) = self.abort.observe(event, now) {
            if self.running {
                tracing::debug!("Input ({reason:?}) during {}", self.video.name());
            }
            self.running = false;
        }
    }

    /// One polling tick. `Some` once the iteration is over.
    pub fn tick(&mut self, now: Instant) -> Option<Outcome> {
        if let Verdict::Abort(reason) = self.abort.check(now) {
            self.running = false;
            return Some(Outcome::Aborted(reason));
        }
        match self.player.state() {
            PlayerState::Ended => {
                self.running = false;
                Some(Outcome::Ended)
            }
            PlayerState::Failed(message) => {
                self.running = false;
                Some(Outcome::Failed(message))
            }
            PlayerState::Idle | PlayerState::Loading | PlayerState::Playing => None,
        }
    }

    pub fn draw(&mut self, width: u32, height: u32) -> Result<bool> {
        if self.released {
            return Ok(false);
        }
        self.player.draw(width, height)
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.released {
            self.released = true;
            self.player.stop();
            self.player.release();
        }
    }
}

impl<P: Player> Drop for PlaybackSession<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// What to do after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NextClip,
    Exit,
}

/// Decides between clips whether to keep going.
#[derive(Debug, Clone)]
pub struct Rotation {
    on_input: InputAction,
    failures: usize,
    failure_budget: usize,
}

impl Rotation {
    pub fn new(on_input: InputAction, library_len: usize) -> Self {
        Self {
            on_input,
            failures: 0,
            failure_budget: library_len.clamp(3, 32),
        }
    }

    pub fn after(&mut self, outcome: &Outcome) -> Result<Step> {
        match outcome {
            Outcome::Ended => {
                self.failures = 0;
                Ok(Step::NextClip)
            }
            Outcome::Aborted(AbortReason::Quit) => Ok(Step::Exit),
            Outcome::Aborted(AbortReason::Input) => {
                self.failures = 0;
                Ok(match self.on_input {
                    InputAction::Exit => Step::Exit,
                    InputAction::Next => Step::NextClip,
                })
            }
            Outcome::Failed(_) => self.failed(),
        }
    }

    /// Counts a clip that could not even be started.
    pub fn failed(&mut self) -> Result<Step> {
        self.failures += 1;
        if self.failures >= self.failure_budget {
            Err(Error::TooManyFailures(self.failures))
        } else {
            Ok(Step::NextClip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::Point;
    use crate::media::VideoFormat;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
    }

    impl Log {
        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| **c == call).count()
        }
    }

    struct MockPlayer {
        log: Rc<RefCell<Log>>,
        states: VecDeque<PlayerState>,
        fail_load: bool,
    }

    impl MockPlayer {
        fn new(states: impl IntoIterator<Item = PlayerState>) -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            let player = Self {
                log: log.clone(),
                states: states.into_iter().collect(),
                fail_load: false,
            };
            (player, log)
        }
    }

    impl Player for MockPlayer {
        fn load(&mut self, path: &Path) -> Result<()> {
            self.log.borrow_mut().calls.push("load");
            if self.fail_load {
                Err(Error::InvalidPath(path.to_path_buf()))
            } else {
                Ok(())
            }
        }

        fn play(&mut self) -> Result<()> {
            self.log.borrow_mut().calls.push("play");
            Ok(())
        }

        fn state(&mut self) -> PlayerState {
            self.states.pop_front().unwrap_or(PlayerState::Playing)
        }

        fn stop(&mut self) {
            self.log.borrow_mut().calls.push("stop");
        }

        fn release(&mut self) {
            self.log.borrow_mut().calls.push("release");
        }
    }

    fn video() -> VideoFile {
        VideoFile {
            path: PathBuf::from("/clips/sea.mp4"),
            format: VideoFormat::Container,
        }
    }

    fn controller(now: Instant) -> AbortController {
        AbortController::new(5, Duration::ZERO, now)
    }

    #[test]
    fn natural_end_is_not_an_abort() {
        let now = Instant::now();
        let (player, log) = MockPlayer::new([PlayerState::Loading, PlayerState::Playing, PlayerState::Ended]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        assert_eq!(session.tick(now), None);
        assert_eq!(session.tick(now), None);
        assert_eq!(session.tick(now), Some(Outcome::Ended));
        assert!(!session.is_running());
        session.close();

        assert_eq!(log.borrow().calls, ["load", "play", "stop", "release"]);
        let mut rotation = Rotation::new(InputAction::Exit, 4);
        assert_eq!(rotation.after(&Outcome::Ended).unwrap(), Step::NextClip);
    }

    #[test]
    fn pointer_motion_aborts_and_releases_once() {
        let now = Instant::now();
        let (player, log) = MockPlayer::new([]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        session.handle_input(InputEvent::PointerMoved(Point::new(100, 100)), now);
        assert_eq!(session.tick(now), None);
        session.handle_input(InputEvent::PointerMoved(Point::new(110, 100)), now);
        assert!(!session.is_running());
        assert_eq!(session.tick(now), Some(Outcome::Aborted(AbortReason::Input)));
        drop(session);

        assert_eq!(log.borrow().count("release"), 1);
        assert_eq!(log.borrow().count("stop"), 1);
    }

    #[test]
    fn key_beats_a_simultaneous_end_of_stream() {
        let now = Instant::now();
        let (player, _log) = MockPlayer::new([PlayerState::Ended]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        session.handle_input(InputEvent::KeyPressed, now);
        assert_eq!(session.tick(now), Some(Outcome::Aborted(AbortReason::Input)));
    }

    #[test]
    fn failed_load_still_releases() {
        let now = Instant::now();
        let (mut player, log) = MockPlayer::new([]);
        player.fail_load = true;
        let result = PlaybackSession::start(video(), player, controller(now));
        assert!(result.is_err());
        assert_eq!(log.borrow().calls, ["load", "stop", "release"]);
    }

    #[test]
    fn failed_stream_reports_and_releases_once() {
        let now = Instant::now();
        let (player, log) = MockPlayer::new([PlayerState::Failed("no codec".into())]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        assert_eq!(session.tick(now), Some(Outcome::Failed("no codec".into())));
        session.close();
        assert_eq!(log.borrow().count("release"), 1);
    }

    #[test]
    fn draw_after_close_is_a_no_op() {
        let now = Instant::now();
        let (player, _log) = MockPlayer::new([]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        session.shutdown();
        assert!(!session.draw(1920, 1080).unwrap());
    }

    #[test]
    fn rotation_follows_input_action() {
        let mut exit = Rotation::new(InputAction::Exit, 10);
        assert_eq!(exit.after(&Outcome::Aborted(AbortReason::Input)).unwrap(), Step::Exit);

        let mut next = Rotation::new(InputAction::Next, 10);
        assert_eq!(next.after(&Outcome::Aborted(AbortReason::Input)).unwrap(), Step::NextClip);
        assert_eq!(next.after(&Outcome::Aborted(AbortReason::Quit)).unwrap(), Step::Exit);
    }

    #[test]
    fn close_after_a_key_still_exits_in_next_mode() {
        let now = Instant::now();
        let (player, log) = MockPlayer::new([]);
        let mut session = PlaybackSession::start(video(), player, controller(now)).unwrap();
        session.handle_input(InputEvent::KeyPressed, now);
        session.handle_input(InputEvent::Quit, now);
        let outcome = session.tick(now).unwrap();
        assert_eq!(outcome, Outcome::Aborted(AbortReason::Quit));
        drop(session);
        assert_eq!(log.borrow().count("release"), 1);

        let mut next = Rotation::new(InputAction::Next, 3);
        assert_eq!(next.after(&outcome).unwrap(), Step::Exit);
    }

    #[test]
    fn failures_skip_until_the_budget_runs_out() {
        let mut rotation = Rotation::new(InputAction::Exit, 1);
        let failed = Outcome::Failed("broken".into());
        assert_eq!(rotation.after(&failed).unwrap(), Step::NextClip);
        assert_eq!(rotation.after(&failed).unwrap(), Step::NextClip);
        assert!(matches!(rotation.after(&failed), Err(Error::TooManyFailures(3))));
    }

    #[test]
    fn a_good_clip_resets_the_failure_count() {
        let mut rotation = Rotation::new(InputAction::Exit, 3);
        let failed = Outcome::Failed("broken".into());
        rotation.after(&failed).unwrap();
        rotation.after(&failed).unwrap();
        rotation.after(&Outcome::Ended).unwrap();
        rotation.after(&failed).unwrap();
        assert_eq!(rotation.after(&failed).unwrap(), Step::NextClip);
    }
}
