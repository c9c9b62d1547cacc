use std::fmt;
use std::str::FromStr;

/// Lifecycle points of a run that notifiers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    Start,
    Skip,
    Success,
    Failure,
}

impl Event {
    pub const ALL: [Event; 4] = [Event::Start, Event::Skip, Event::Success, Event::Failure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Start => "onStart",
            Event::Skip => "onSkip",
            Event::Success => "onSuccess",
            Event::Failure => "onFailure",
        }
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "onStart" => Ok(Event::Start),
            "onSkip" | "onSkipped" => Ok(Event::Skip),
            "onSuccess" => Ok(Event::Success),
            "onFailure" => Ok(Event::Failure),
            other => Err(format!(
                "invalid event {}; expected onStart, onSkip, onSuccess, or onFailure",
                other
            )),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which external-tool operations a run performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operations {
    pub backup: bool,
    pub copy: bool,
    pub prune: bool,
    pub check: bool,
}

impl Operations {
    pub fn all() -> Self {
        Self {
            backup: true,
            copy: true,
            prune: true,
            check: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.backup || self.copy || self.prune || self.check)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    pub debug: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Verbosity {
    pub fn filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_parse_back() {
        for event in Event::ALL {
            assert_eq!(event.as_str().parse::<Event>().expect("parse"), event);
        }
        assert_eq!("onSkipped".parse::<Event>().expect("alias"), Event::Skip);
        assert!("onBegin".parse::<Event>().is_err());
    }

    #[test]
    fn empty_operations() {
        assert!(Operations::default().is_empty());
        assert!(!Operations::all().is_empty());
    }

    #[test]
    fn debug_wins_over_quiet() {
        let v = Verbosity {
            debug: true,
            verbose: false,
            quiet: true,
        };
        assert_eq!(v.filter(), "debug");
    }
}
