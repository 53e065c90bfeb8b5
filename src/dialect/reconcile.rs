//! Merging of several windows over one stream into the single window a
//! restrictive dialect can express.

use std::cmp::Ordering;
use std::time::Duration;

use crate::error::SerializationError;
use crate::term::Term;
use crate::window::WindowSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Widen {
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Duration,
    Count,
}

/// Groups windows by stream. Windows are sorted first, so groups and their
/// members come out in a deterministic order.
pub fn group_by_stream(mut windows: Vec<WindowSpec>) -> Vec<(Term, Vec<WindowSpec>)> {
    windows.sort();
    let mut groups: Vec<(Term, Vec<WindowSpec>)> = Vec::new();
    for window in windows {
        match groups.iter_mut().find(|(s, _)| s == window.stream_id()) {
            Some((_, group)) => group.push(window),
            None => groups.push((window.stream_id().clone(), vec![window])),
        }
    }
    groups
}

/// Folds a non-empty group with [`combine`].
pub fn combine_all(group: &[WindowSpec], min_step: Duration) -> Result<WindowSpec, SerializationError> {
    let (first, rest) = group
        .split_first()
        .ok_or_else(|| SerializationError::UnknownWindow("empty window group".into()))?;
    rest.iter()
        .try_fold(first.clone(), |acc, next| combine(&acc, next, min_step))
}

/// Widest window covering both: the larger range or count, the smaller step.
/// An absent step stands for `min_step`; the identity of `a` is kept.
pub fn combine(
    a: &WindowSpec,
    b: &WindowSpec,
    min_step: Duration,
) -> Result<WindowSpec, SerializationError> {
    let stream = a.stream_id().to_string();
    let merge = |field: &'static str, x: &Term, y: &Term, widen: Widen, scalar: Scalar| {
        merge(&stream, field, x, y, widen, scalar)
    };
    let merge_step = |x: Option<&Term>,
                      y: Option<&Term>,
                      scalar: Scalar|
     -> Result<Option<Term>, SerializationError> {
        let min = || match scalar {
            Scalar::Duration => Term::from_duration(min_step),
            Scalar::Count => Term::integer(1),
        };
        match (x, y) {
            (None, None) => Ok(None),
            (Some(x), Some(y)) => merge("step", x, y, Widen::Min, scalar).map(Some),
            (Some(x), None) | (None, Some(x)) => merge("step", x, &min(), Widen::Min, scalar).map(Some),
        }
    };

    match (a, b) {
        (
            WindowSpec::Logical {
                window_id,
                stream_id,
                range: r1,
                step: s1,
            },
            WindowSpec::Logical {
                range: r2, step: s2, ..
            },
        ) => Ok(WindowSpec::logical(
            window_id.clone(),
            stream_id.clone(),
            merge("range", r1, r2, Widen::Max, Scalar::Duration)?,
            merge_step(s1.as_ref(), s2.as_ref(), Scalar::Duration)?,
        )),
        (
            WindowSpec::Physical {
                window_id,
                stream_id,
                item_count: c1,
                step: s1,
            },
            WindowSpec::Physical {
                item_count: c2,
                step: s2,
                ..
            },
        ) => Ok(WindowSpec::physical(
            window_id.clone(),
            stream_id.clone(),
            merge("item count", c1, c2, Widen::Max, Scalar::Count)?,
            merge_step(s1.as_ref(), s2.as_ref(), Scalar::Count)?,
        )),
        (
            WindowSpec::LogicalPast {
                window_id,
                stream_id,
                from: f1,
                to: t1,
                step: s1,
            },
            WindowSpec::LogicalPast {
                from: f2,
                to: t2,
                step: s2,
                ..
            },
        ) => Ok(WindowSpec::logical_past(
            window_id.clone(),
            stream_id.clone(),
            merge("from", f1, f2, Widen::Max, Scalar::Duration)?,
            merge("to", t1, t2, Widen::Min, Scalar::Duration)?,
            merge_step(s1.as_ref(), s2.as_ref(), Scalar::Duration)?,
        )),
        _ => Err(SerializationError::IncompatibleWindowKinds {
            stream,
            first: a.kind().name(),
            second: b.kind().name(),
        }),
    }
}

fn merge(
    stream: &str,
    field: &'static str,
    a: &Term,
    b: &Term,
    widen: Widen,
    scalar: Scalar,
) -> Result<Term, SerializationError> {
    if a == b {
        return Ok(a.clone());
    }
    if a.is_variable() || b.is_variable() {
        return Err(SerializationError::CannotCombineAcrossVariables {
            stream: stream.to_string(),
            field,
        });
    }
    let ordering = match scalar {
        Scalar::Duration => read_duration(stream, field, a)?.cmp(&read_duration(stream, field, b)?),
        Scalar::Count => read_count(stream, field, a)?.cmp(&read_count(stream, field, b)?),
    };
    let keep_a = match widen {
        Widen::Max => ordering != Ordering::Less,
        Widen::Min => ordering != Ordering::Greater,
    };
    Ok(if keep_a { a.clone() } else { b.clone() })
}

fn read_duration(stream: &str, field: &'static str, term: &Term) -> Result<Duration, SerializationError> {
    match term.to_duration() {
        Some(d) => Ok(d?),
        None => Err(SerializationError::InvalidScalar {
            window: stream.to_string(),
            field,
            expected: "duration",
        }),
    }
}

fn read_count(stream: &str, field: &'static str, term: &Term) -> Result<u64, SerializationError> {
    term.to_count().ok_or_else(|| SerializationError::InvalidScalar {
        window: stream.to_string(),
        field,
        expected: "count",
    })
}

/// A past window ending now, read as a logical window of the same range.
pub fn as_logical(window: &WindowSpec) -> Option<WindowSpec> {
    let WindowSpec::LogicalPast {
        window_id,
        stream_id,
        from,
        to,
        step,
    } = window
    else {
        return None;
    };
    match to.to_duration() {
        Some(Ok(d)) if d.is_zero() => Some(WindowSpec::logical(
            window_id.clone(),
            stream_id.clone(),
            from.clone(),
            step.clone(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Term {
        Term::iri(s).unwrap()
    }

    fn dur(s: &str) -> Term {
        Term::duration(s).unwrap()
    }

    fn logical(id: &str, range: &str, step: Option<&str>) -> WindowSpec {
        WindowSpec::logical(iri(id), iri("http://s"), dur(range), step.map(dur))
    }

    #[test]
    fn test_max_range_min_step() {
        let a = logical("http://w1", "PT10S", Some("PT5S"));
        let b = logical("http://w2", "PT20S", Some("PT2S"));
        let c = combine(&a, &b, Duration::from_millis(1)).unwrap();
        assert_eq!(c, logical("http://w1", "PT20S", Some("PT2S")));
    }

    #[test]
    fn test_absent_step_is_the_minimum_step() {
        let a = logical("http://w1", "PT10S", Some("PT5S"));
        let b = logical("http://w2", "PT10S", None);
        let c = combine(&a, &b, Duration::from_millis(1)).unwrap();
        assert_eq!(c.step(), Some(&dur("PT0.001S")));

        let d = combine(&b, &logical("http://w3", "PT1S", None), Duration::from_millis(1)).unwrap();
        assert_eq!(d.step(), None);
    }

    #[test]
    fn test_variables_do_not_combine() {
        let a = WindowSpec::logical(iri("http://w1"), iri("http://s"), Term::variable("r").unwrap(), None);
        let b = logical("http://w2", "PT20S", None);
        assert_eq!(
            combine(&a, &b, Duration::from_millis(1)),
            Err(SerializationError::CannotCombineAcrossVariables {
                stream: "<http://s>".into(),
                field: "range"
            })
        );
        let same = WindowSpec::logical(iri("http://w3"), iri("http://s"), Term::variable("r").unwrap(), None);
        assert!(combine(&a, &same, Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_kinds_do_not_mix() {
        let a = logical("http://w1", "PT10S", None);
        let b = WindowSpec::physical(iri("http://w2"), iri("http://s"), Term::integer(5), None);
        assert!(matches!(
            combine(&a, &b, Duration::from_millis(1)),
            Err(SerializationError::IncompatibleWindowKinds {
                first: "logical",
                second: "physical",
                ..
            })
        ));
    }

    #[test]
    fn test_past_windows_widen_both_ends() {
        let a = WindowSpec::logical_past(iri("http://w1"), iri("http://s"), dur("PT1H"), dur("PT10M"), None);
        let b = WindowSpec::logical_past(iri("http://w2"), iri("http://s"), dur("PT30M"), dur("PT0S"), None);
        let c = combine(&a, &b, Duration::from_millis(1)).unwrap();
        assert_eq!(c.terms()[2], &dur("PT1H"));
        assert_eq!(c.terms()[3], &dur("PT0S"));
    }

    #[test]
    fn test_group_by_stream() {
        let a = logical("http://w2", "PT1S", None);
        let b = WindowSpec::logical(iri("http://w1"), iri("http://other"), dur("PT1S"), None);
        let c = logical("http://w3", "PT1S", None);
        let groups = group_by_stream(vec![c, a, b]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, iri("http://other"));
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].window_id(), &iri("http://w2"));
    }

    #[test]
    fn test_past_window_ending_now_reads_as_logical() {
        let past = WindowSpec::logical_past(iri("http://w"), iri("http://s"), dur("PT1H"), dur("PT0S"), None);
        assert_eq!(
            as_logical(&past),
            Some(WindowSpec::logical(iri("http://w"), iri("http://s"), dur("PT1H"), None))
        );
        let open = WindowSpec::logical_past(iri("http://w"), iri("http://s"), dur("PT1H"), dur("PT1M"), None);
        assert_eq!(as_logical(&open), None);
    }
}
