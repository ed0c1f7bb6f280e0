use crate::{
    element::Element,
    error::{Error, Result},
    kind::ContainerKind,
    MAX_DEPTH,
};

#[derive(Clone, Debug)]
struct Level {
    container: ContainerKind,
    /// Elements still expected before the end tag. Maps count keys and values separately.
    remaining: usize,
    empty: bool,
    /// Last element seen at this level was a Double run.
    after_doubles: bool,
}

/// Checks that a stream of elements nests correctly: counts agree with the number of
/// elements, end tags match their start tags, and Double runs appear only where allowed.
#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    tracking: Vec<Level>,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new() -> Self {
        Self {
            tracking: Vec::new(),
        }
    }

    /// Update the depth tracker on each new element.
    pub fn update_elem(&mut self, elem: &Element) -> Result<()> {
        let width = match elem {
            Element::ContainerEnd { container, empty } => {
                return self.end_container(*container, *empty)
            }
            Element::MessageStart { .. } | Element::MessageEnd { .. } => {
                if let Some(level) = self.tracking.last() {
                    return Err(Error::BadFraming(format!(
                        "Message tag found inside an unfinished {}",
                        level.container.name()
                    )));
                }
                return Ok(());
            }
            Element::Doubles(run) => run.len(),
            _ => 1,
        };

        // Subtract from count for this element
        if let Some(level) = self.tracking.last_mut() {
            if width > level.remaining {
                return Err(Error::BadEncode(format!(
                    "{} holds more elements than its count",
                    level.container.name()
                )));
            }
            if let Element::Doubles(_) = elem {
                if level.container != ContainerKind::Array && width > 1 {
                    return Err(Error::BadEncode(format!(
                        "Got a run of {} Doubles inside a {}. Runs are only allowed in an Array.",
                        width,
                        level.container.name()
                    )));
                }
                if level.container == ContainerKind::Array && level.after_doubles {
                    return Err(Error::BadEncode(String::from(
                        "Got two adjacent Double runs. This is not the shortest encoding.",
                    )));
                }
                level.after_doubles = true;
            } else {
                level.after_doubles = false;
            }
            level.remaining -= width;
        }

        // Increase nest depth if this is a nesting element
        if let Element::ContainerStart(container, count) = elem {
            let remaining = match container {
                ContainerKind::Map => count.checked_mul(2).ok_or_else(|| {
                    Error::ParseLimit(format!("Map count = {} is too large", count))
                })?,
                _ => *count,
            };
            self.tracking.push(Level {
                container: *container,
                remaining,
                empty: *count == 0,
                after_doubles: false,
            });
            // Check to see if we hit the nesting limit
            if self.tracking.len() > MAX_DEPTH {
                return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
            }
        }
        Ok(())
    }

    fn end_container(&mut self, container: ContainerKind, empty: bool) -> Result<()> {
        let level = self.tracking.pop().ok_or_else(|| {
            Error::BadEncode(format!("{} end without a matching start", container.name()))
        })?;
        if level.remaining != 0 {
            return Err(Error::BadEncode(format!(
                "{} ended with {} elements still expected",
                level.container.name(),
                level.remaining
            )));
        }
        if level.container != container || level.empty != empty {
            return Err(Error::BadEncode(format!(
                "{} end (empty = {}) doesn't match {} start (empty = {})",
                container.name(),
                empty,
                level.container.name(),
                level.empty
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::borrow::Cow;

    fn end(container: ContainerKind, empty: bool) -> Element<'static> {
        Element::ContainerEnd { container, empty }
    }

    #[test]
    fn nested() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Array, 2))
            .unwrap();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Map, 1))
            .unwrap();
        assert_eq!(tracker.tracking.len(), 2);
        tracker.update_elem(&Element::Str("key")).unwrap();
        tracker.update_elem(&Element::Logical(true)).unwrap();
        tracker.update_elem(&end(ContainerKind::Map, false)).unwrap();
        tracker.update_elem(&Element::Integer(3)).unwrap();
        tracker.update_elem(&end(ContainerKind::Array, false)).unwrap();
        assert!(tracker.tracking.is_empty());
    }

    #[test]
    fn runs_count_every_double() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Array, 3))
            .unwrap();
        tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![1.0, 2.0, 3.0])))
            .unwrap();
        tracker.update_elem(&end(ContainerKind::Array, false)).unwrap();
    }

    #[test]
    fn run_overflows_count() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Array, 2))
            .unwrap();
        assert!(tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![1.0, 2.0, 3.0])))
            .is_err());
    }

    #[test]
    fn adjacent_runs() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Array, 2))
            .unwrap();
        tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![1.0])))
            .unwrap();
        assert!(tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![2.0])))
            .is_err());
    }

    #[test]
    fn map_doubles_are_single() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Map, 1))
            .unwrap();
        tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![1.0])))
            .unwrap();
        tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![2.0])))
            .unwrap();
        tracker.update_elem(&end(ContainerKind::Map, false)).unwrap();

        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Set, 2))
            .unwrap();
        assert!(tracker
            .update_elem(&Element::Doubles(Cow::Owned(vec![1.0, 2.0])))
            .is_err());
    }

    #[test]
    fn end_mismatch() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Set, 0))
            .unwrap();
        assert!(tracker.update_elem(&end(ContainerKind::Set, false)).is_err());

        let mut tracker = DepthTracker::new();
        assert!(tracker.update_elem(&end(ContainerKind::Array, true)).is_err());
    }

    #[test]
    fn message_inside_container() {
        let mut tracker = DepthTracker::new();
        tracker
            .update_elem(&Element::ContainerStart(ContainerKind::Array, 1))
            .unwrap();
        let result = tracker.update_elem(&Element::MessageEnd {
            empty: false,
            expected: crate::kind::Category::Other,
        });
        assert!(matches!(result, Err(Error::BadFraming(_))));
    }

    #[test]
    fn depth_limit() {
        let mut tracker = DepthTracker::new();
        for _ in 0..MAX_DEPTH {
            tracker
                .update_elem(&Element::ContainerStart(ContainerKind::Array, 1))
                .unwrap();
        }
        let result = tracker.update_elem(&Element::ContainerStart(ContainerKind::Array, 1));
        assert!(matches!(result, Err(Error::ParseLimit(_))));
    }
}
