//! Locations inside a JSON request, used to point errors at the offending key.

use std::fmt;

use itertools::Itertools;

#[derive(Clone, Copy, Debug)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// A borrowed, immutable path threaded down through validation.
///
/// Each level borrows its parent, so descending never mutates shared state
/// and nothing is allocated until an error needs a [`Trail`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Path<'a> {
    parent: Option<&'a Path<'a>>,
    segment: Option<Segment<'a>>,
}

static ROOT: Path<'static> = Path {
    parent: None,
    segment: None,
};

impl Path<'static> {
    pub fn root() -> &'static Path<'static> {
        &ROOT
    }
}

impl<'a> Path<'a> {
    pub fn key<'b>(&'b self, key: &'b str) -> Path<'b> {
        Path {
            parent: Some(self),
            segment: Some(Segment::Key(key)),
        }
    }

    pub fn index(&self, index: usize) -> Path<'_> {
        Path {
            parent: Some(self),
            segment: Some(Segment::Index(index)),
        }
    }

    /// The innermost key name, or `ROOT` for the top level.
    pub fn last_key(&self) -> String {
        match self.segment {
            Some(Segment::Key(key)) => key.to_owned(),
            Some(Segment::Index(index)) => index.to_string(),
            None => "ROOT".to_owned(),
        }
    }

    pub fn to_trail(&self) -> Trail {
        let mut segments = vec![];
        let mut cursor = Some(self);
        while let Some(path) = cursor {
            match path.segment {
                Some(Segment::Key(key)) => segments.push(key.to_owned()),
                Some(Segment::Index(index)) => segments.push(index.to_string()),
                None => {}
            }
            cursor = path.parent;
        }
        segments.reverse();
        Trail(segments)
    }
}

/// An owned snapshot of a [`Path`], attached to errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trail(pub Vec<String>);

impl Trail {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(" -> "))
    }
}
