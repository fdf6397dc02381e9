//! Icon identifiers and the validated set a board is built from.

use std::collections::HashSet;
use std::fmt;

use super::BoardError;

/// Symbol identifier shown on the face of a card.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct IconId(String);

impl IconId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IconId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Non-empty list of distinct icons. Each icon contributes one pair.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<IconId>", into = "Vec<IconId>"))]
pub struct IconSet {
    icons: Vec<IconId>,
}

impl IconSet {
    pub const DEFAULT_SIZE: usize = 10;

    pub fn new<I, T>(icons: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = T>,
        T: Into<IconId>,
    {
        let icons: Vec<IconId> = icons.into_iter().map(Into::into).collect();
        if icons.is_empty() {
            return Err(BoardError::EmptyIconSet);
        }

        let mut seen = HashSet::with_capacity(icons.len());
        for icon in &icons {
            if !seen.insert(icon) {
                return Err(BoardError::DuplicateIcon(icon.clone()));
            }
        }

        Ok(Self { icons })
    }

    /// `icon0` .. `icon{count-1}`.
    pub fn numbered(count: usize) -> Result<Self, BoardError> {
        Self::new((0..count).map(|i| IconId::new(format!("icon{i}"))))
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn as_slice(&self) -> &[IconId] {
        &self.icons
    }
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            icons: (0..Self::DEFAULT_SIZE)
                .map(|i| IconId::new(format!("icon{i}")))
                .collect(),
        }
    }
}

impl TryFrom<Vec<IconId>> for IconSet {
    type Error = BoardError;

    fn try_from(icons: Vec<IconId>) -> Result<Self, Self::Error> {
        Self::new(icons)
    }
}

impl From<IconSet> for Vec<IconId> {
    fn from(set: IconSet) -> Self {
        set.icons
    }
}
