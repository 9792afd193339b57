//! Playback source selection.
//!
//! A browser may fail to decode a track from its primary URL. The client
//! then walks an ordered list of alternative URLs, a few at a time, until one
//! plays or the list runs out. This module builds that list and models the
//! walk so the client can follow it step by step.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::Track;

/// How many candidates one playback pass may try.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Formats the stream endpoint can be asked for, in preference order.
const FORMAT_PREFERENCE: &[&str] = &["mp3", "ogg", "wav"];

/// Audio formats the client reports it can decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedFormats {
    pub mp3: bool,
    pub ogg: bool,
    pub wav: bool,
}

impl SupportedFormats {
    /// Parse a comma-separated list such as `mp3,ogg`. Unknown names are ignored.
    pub fn parse(list: &str) -> Self {
        let mut formats = Self::default();
        for name in list.split(',').map(|s| s.trim().to_lowercase()) {
            match name.as_str() {
                "mp3" => formats.mp3 = true,
                "ogg" => formats.ogg = true,
                "wav" => formats.wav = true,
                _ => {}
            }
        }
        formats
    }

    fn supports(&self, format: &str) -> bool {
        match format {
            "mp3" => self.mp3,
            "ogg" => self.ogg,
            "wav" => self.wav,
            _ => false,
        }
    }

    /// The first supported format in preference order.
    pub fn preferred(&self) -> Option<&'static str> {
        FORMAT_PREFERENCE.iter().copied().find(|f| self.supports(f))
    }
}

fn stream_url(filename: &str, format: Option<&str>) -> String {
    let encoded = urlencoding::encode(filename);
    match format {
        Some(format) => format!("/api/music/stream?filename={}&format={}", encoded, format),
        None => format!("/api/music/stream?filename={}", encoded),
    }
}

/// The URL a track is normally played from.
pub fn primary_source(track: &Track) -> String {
    let path = track.path.as_str();
    if path.starts_with("/api/") || path.starts_with("http") {
        return path.to_string();
    }
    if path.starts_with("/music/") {
        return format!("/api{}", path);
    }
    stream_url(track.file_name(), None)
}

/// Every URL worth trying for `track`, in order, without duplicates.
///
/// Primary source first, then the stream endpoint for each supported
/// format, then the legacy locations.
pub fn fallback_sources(track: &Track, formats: SupportedFormats) -> Vec<String> {
    let filename = track.file_name();
    let encoded = urlencoding::encode(filename);

    let mut candidates = vec![primary_source(track)];
    candidates.extend(
        FORMAT_PREFERENCE
            .iter()
            .filter(|f| formats.supports(f))
            .map(|f| stream_url(filename, Some(f))),
    );
    candidates.push(format!("/api/music/{}", encoded));
    candidates.push(format!("/music/{}", encoded));
    candidates.push(format!("/public/music/{}", encoded));

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| !c.is_empty() && seen.insert(c.clone()));
    candidates
}

/// What the browser reported after trying one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptOutcome {
    /// Playback started.
    Playing,
    /// Autoplay was blocked; the source is fine but needs a user gesture.
    NotAllowed,
    /// Loading was interrupted, typically by another selection.
    Aborted,
    /// The browser cannot decode this source.
    NotSupported,
    /// No data arrived before the stall timeout.
    TimedOut,
    Failed,
}

/// Next thing the client should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Load this URL and try to play it.
    Play(String),
    /// Load this URL but wait for the user before playing.
    Stage(String),
    /// The session is over.
    Finished(PlaybackResult),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackResult {
    Playing(String),
    AwaitingInteraction(String),
    /// No candidate could be played.
    FormatError,
}

/// One bounded pass over the fallback list.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    sources: Vec<String>,
    next: usize,
    end: usize,
    current: Option<String>,
    user_interacted: bool,
    result: Option<PlaybackResult>,
}

impl PlaybackSession {
    /// Try at most `max_attempts` sources starting at `start`.
    pub fn new(
        sources: Vec<String>,
        start: usize,
        max_attempts: usize,
        user_interacted: bool,
    ) -> Self {
        let end = sources.len().min(start.saturating_add(max_attempts));
        Self {
            sources,
            next: start,
            end,
            current: None,
            user_interacted,
            result: None,
        }
    }

    /// First step of the session.
    pub fn start(&mut self) -> Step {
        self.advance()
    }

    /// Feed back the outcome of the last `Play` step.
    pub fn report(&mut self, outcome: AttemptOutcome) -> Step {
        if let Some(result) = &self.result {
            return Step::Finished(result.clone());
        }
        let Some(current) = self.current.take() else {
            return self.advance();
        };

        match outcome {
            AttemptOutcome::Playing => self.finish(PlaybackResult::Playing(current)),
            AttemptOutcome::NotAllowed => {
                self.finish(PlaybackResult::AwaitingInteraction(current))
            }
            AttemptOutcome::Aborted
            | AttemptOutcome::NotSupported
            | AttemptOutcome::TimedOut
            | AttemptOutcome::Failed => {
                tracing::debug!(source = %current, ?outcome, "Playback source failed");
                self.advance()
            }
        }
    }

    /// True once every allowed candidate has failed.
    pub fn format_error(&self) -> bool {
        matches!(self.result, Some(PlaybackResult::FormatError))
    }

    /// Index to resume from in a later pass.
    pub fn resume_index(&self) -> usize {
        self.next
    }

    fn advance(&mut self) -> Step {
        if self.next >= self.end {
            return self.finish(PlaybackResult::FormatError);
        }

        let source = self.sources[self.next].clone();
        self.next += 1;

        if !self.user_interacted {
            self.result = Some(PlaybackResult::AwaitingInteraction(source.clone()));
            return Step::Stage(source);
        }

        self.current = Some(source.clone());
        Step::Play(source)
    }

    fn finish(&mut self, result: PlaybackResult) -> Step {
        self.result = Some(result.clone());
        Step::Finished(result)
    }
}

/// Wire form of a session step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum NextSource {
    Play { index: usize, source: String },
    Stage { index: usize, source: String },
    /// A source is playing; nothing more to try.
    Playing { source: String },
    /// A source loaded but the browser wants a user gesture first.
    AwaitingInteraction { source: String },
    Exhausted,
}

impl NextSource {
    fn from_step(step: Step, session: &PlaybackSession) -> Self {
        // Play and Stage always come right after `advance` moved past them.
        let index = session.resume_index().saturating_sub(1);
        match step {
            Step::Play(source) => Self::Play { index, source },
            Step::Stage(source) => Self::Stage { index, source },
            Step::Finished(PlaybackResult::Playing(source)) => Self::Playing { source },
            Step::Finished(PlaybackResult::AwaitingInteraction(source)) => {
                Self::AwaitingInteraction { source }
            }
            Step::Finished(PlaybackResult::FormatError) => Self::Exhausted,
        }
    }
}

/// Outcome of one source, as reported back by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptReport {
    /// Index into the source list of the source that was tried.
    pub index: usize,
    pub outcome: AttemptOutcome,
}

/// Sources for a track as returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPlan {
    pub track_id: String,
    pub sources: Vec<String>,
    pub max_attempts: usize,
    /// Format to request first when retrying after a decode error.
    pub preferred_format: Option<&'static str>,
    /// What to do next in the pass starting at the requested index.
    pub next: NextSource,
    /// Every source allowed in this pass has failed.
    pub format_error: bool,
    /// Index a later pass should start from.
    pub resume_index: usize,
}

impl PlaybackPlan {
    /// Plan a pass over `track`'s sources beginning at `start`.
    ///
    /// With a `report`, the pass is replayed up to the reported source,
    /// treating every earlier source in the pass as failed, and the
    /// reported outcome decides the next step.
    pub fn for_track(
        track: &Track,
        formats: SupportedFormats,
        start: usize,
        user_interacted: bool,
        report: Option<AttemptReport>,
    ) -> AppResult<Self> {
        let sources = fallback_sources(track, formats);
        let mut session =
            PlaybackSession::new(sources.clone(), start, DEFAULT_MAX_ATTEMPTS, user_interacted);
        let mut step = session.start();

        if let Some(report) = report {
            let end = sources.len().min(start.saturating_add(DEFAULT_MAX_ATTEMPTS));
            if report.index < start || report.index >= end {
                return Err(AppError::BadRequest(format!(
                    "Attempt index {} is outside the pass {}..{}",
                    report.index, start, end
                )));
            }

            while matches!(step, Step::Play(_)) && session.resume_index() <= report.index {
                step = session.report(AttemptOutcome::Failed);
            }
            if matches!(step, Step::Play(_)) {
                step = session.report(report.outcome);
            }
        }

        let next = NextSource::from_step(step, &session);
        Ok(Self {
            track_id: track.id.clone(),
            sources,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            preferred_format: formats.preferred(),
            next,
            format_error: session.format_error(),
            resume_index: session.resume_index(),
        })
    }
}
