use std::{
    collections::VecDeque,
    fmt,
    io::{self, Read},
};

/// A single logical stream made of several byte streams read back to back.
///
/// Appending another `Concat` splices its members in place instead of nesting
/// it, so a read never walks more than one level of readers.
#[derive(Default)]
pub struct Concat<'a> {
    readers: VecDeque<Box<dyn Read + 'a>>,
}

impl<'a> Concat<'a> {
    /// A concatenation with no members; reads return end of input.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: VecDeque::new(),
        }
    }

    /// Appends `reader` as one member.
    ///
    /// A `Concat` passed here is nested whole rather than spliced; use
    /// [`then_concat`](Self::then_concat) to flatten it.
    #[must_use]
    pub fn then<R: Read + 'a>(mut self, reader: R) -> Self {
        self.push(reader);
        self
    }

    /// Appends every member of `other`, keeping their order.
    #[must_use]
    pub fn then_concat(mut self, other: Concat<'a>) -> Self {
        self.append(other);
        self
    }

    /// In-place form of [`then`](Self::then).
    pub fn push<R: Read + 'a>(&mut self, reader: R) {
        self.readers.push_back(Box::new(reader));
    }

    /// In-place form of [`then_concat`](Self::then_concat).
    pub fn append(&mut self, mut other: Concat<'a>) {
        self.readers.append(&mut other.readers);
    }

    /// Number of streams not yet exhausted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Whether every member has been exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

impl<'a> Extend<Concat<'a>> for Concat<'a> {
    fn extend<T: IntoIterator<Item = Concat<'a>>>(&mut self, iter: T) {
        for other in iter {
            self.append(other);
        }
    }
}

impl<'a> FromIterator<Concat<'a>> for Concat<'a> {
    fn from_iter<T: IntoIterator<Item = Concat<'a>>>(iter: T) -> Self {
        let mut concat = Concat::new();
        concat.extend(iter);
        concat
    }
}

impl Read for Concat<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(front) = self.readers.front_mut() {
            match front.read(buf) {
                Ok(0) => {
                    self.readers.pop_front();
                }
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(0)
    }
}

impl fmt::Debug for Concat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concat")
            .field("remaining", &self.readers.len())
            .finish()
    }
}
