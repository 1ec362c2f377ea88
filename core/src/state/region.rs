//! Exception region bookkeeping.

use ecow::EcoString;
use smallvec::SmallVec;
use verasm_types::SemanticType;

use crate::error::HandlerKind;
use crate::{Vec, fmt, format};

/// Which part of a region a block path entry is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Body {
    /// The protected body.
    Try,
    /// A catch or finally body, by handler index.
    Handler(u32),
    /// After a handler ended and before the next one begins or the region
    /// ends.
    Between,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockEntry {
    pub region: u32,
    pub body: Body,
}

/// Chain of enclosing region bodies, outermost first.
pub type BlockPath = SmallVec<[BlockEntry; 4]>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerSort {
    Catch(SemanticType),
    CatchAll,
    Finally,
}

impl HandlerSort {
    pub fn kind(&self) -> HandlerKind {
        match self {
            HandlerSort::Catch(_) | HandlerSort::CatchAll => HandlerKind::Catch,
            HandlerSort::Finally => HandlerKind::Finally,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerRecord {
    pub region: u32,
    pub sort: HandlerSort,
    pub start: usize,
    pub end: Option<usize>,
}

impl HandlerRecord {
    pub fn describe(&self, index: usize) -> EcoString {
        match self.sort.kind() {
            HandlerKind::Catch => format!("CatchBlock #{index}").into(),
            HandlerKind::Finally => format!("FinallyBlock #{index}").into(),
        }
    }
}

/// Where a region is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionPhase {
    TryOpen,
    CatchOpen,
    FinallyOpen,
    /// A handler has ended and another may begin.
    BetweenHandlers,
    Closed,
}

impl fmt::Display for RegionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RegionPhase::TryOpen => "try open",
            RegionPhase::CatchOpen => "in catch",
            RegionPhase::FinallyOpen => "in finally",
            RegionPhase::BetweenHandlers => "between handlers",
            RegionPhase::Closed => "closed",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRecord {
    pub start: usize,
    pub end: Option<usize>,
    /// Indices into the handler table, in the order they began.
    pub handlers: Vec<u32>,
    pub open_handler: Option<u32>,
    /// Enclosing region at the time this one began.
    pub parent: Option<u32>,
}

impl RegionRecord {
    pub fn new(start: usize, parent: Option<u32>) -> Self {
        Self {
            start,
            end: None,
            handlers: Vec::new(),
            open_handler: None,
            parent,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }

    pub fn phase(&self, handlers: &[HandlerRecord]) -> RegionPhase {
        if self.is_closed() {
            return RegionPhase::Closed;
        }
        match self.open_handler {
            Some(h) => match handlers[h as usize].sort.kind() {
                HandlerKind::Catch => RegionPhase::CatchOpen,
                HandlerKind::Finally => RegionPhase::FinallyOpen,
            },
            None if self.handlers.is_empty() => RegionPhase::TryOpen,
            None => RegionPhase::BetweenHandlers,
        }
    }

    pub fn has_finally(&self, handlers: &[HandlerRecord]) -> bool {
        self.handlers
            .iter()
            .any(|&h| handlers[h as usize].sort == HandlerSort::Finally)
    }
}

pub fn describe_region(index: u32) -> EcoString {
    format!("ExceptionBlock #{index}").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_follows_handlers() {
        let mut handlers = Vec::new();
        let mut region = RegionRecord::new(0, None);
        assert_eq!(region.phase(&handlers), RegionPhase::TryOpen);

        handlers.push(HandlerRecord {
            region: 0,
            sort: HandlerSort::CatchAll,
            start: 3,
            end: None,
        });
        region.handlers.push(0);
        region.open_handler = Some(0);
        assert_eq!(region.phase(&handlers), RegionPhase::CatchOpen);

        region.open_handler = None;
        assert_eq!(region.phase(&handlers), RegionPhase::BetweenHandlers);
        assert!(!region.has_finally(&handlers));

        region.end = Some(9);
        assert_eq!(region.phase(&handlers), RegionPhase::Closed);
    }
}
