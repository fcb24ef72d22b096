//! The diagnostic sink (§7): "purely observational and never changes the merge
//! outcome". Structured `log` calls when unbuffered, matching the call sites the
//! teacher sprinkles through `merge.rs`/`odb.rs` (`trace!`/`debug!`/`info!`/`warn!`);
//! buffered into a `Vec<String>` when the caller asked for `buffer_output` so they can
//! inspect or replay diagnostics without installing a `log` subscriber.

use crate::opts::Verbosity;

pub struct Diagnostics {
    verbosity: Verbosity,
    buffer: Option<Vec<String>>,
}

impl Diagnostics {
    pub fn new(verbosity: Verbosity, buffer_output: bool) -> Self {
        Self { verbosity, buffer: buffer_output.then(Vec::new) }
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.emit(Verbosity::Normal, msg.into())
    }

    pub fn verbose(&mut self, msg: impl Into<String>) {
        self.emit(Verbosity::Verbose, msg.into())
    }

    /// collision-induced rename skips, submodule-merge fallbacks, etc (§7 "Per-path,
    /// demoted with diagnostic") — always emitted regardless of verbosity, since these
    /// indicate the engine silently deviated from what the caller's rename detector
    /// asked for
    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::warn!("{}", msg);
        if let Some(buffer) = &mut self.buffer {
            buffer.push(msg);
        }
    }

    fn emit(&mut self, level: Verbosity, msg: String) {
        if self.verbosity < level {
            return;
        }
        match level {
            Verbosity::Verbose => log::debug!("{}", msg),
            _ => log::info!("{}", msg),
        }
        if let Some(buffer) = &mut self.buffer {
            buffer.push(msg);
        }
    }

    /// drains whatever was buffered; empty if `buffer_output` was never set
    pub fn take_buffered(&mut self) -> Vec<String> {
        self.buffer.take().unwrap_or_default()
    }
}
