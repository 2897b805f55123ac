use std::fmt::Display;

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct LabelString(Vec<String>);

pub fn labels_equal(vec1: &LabelString, vec2: &LabelString) -> bool {
    if vec1.as_slice().len() != vec2.as_slice().len() {
        return false;
    }

    for (elem1, elem2) in vec1.as_slice().iter().zip(vec2.as_slice().iter()) {
        if !elem1.eq_ignore_ascii_case(elem2) {
            return false;
        }
    }

    true
}

impl LabelString {
    /// Splits a dotted name into labels, empty segments are skipped.
    pub fn from(string: &str) -> Self {
        LabelString(
            string
                .split('.')
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the name on the wire, including length octets and the root label.
    pub fn wire_len(&self) -> usize {
        self.0.iter().map(|label| label.len() + 1).sum::<usize>() + 1
    }
}

impl PartialEq for LabelString {
    fn eq(&self, other: &Self) -> bool {
        labels_equal(self, other)
    }
}

impl From<&[String]> for LabelString {
    fn from(value: &[String]) -> Self {
        LabelString(value.to_vec())
    }
}

impl From<Vec<String>> for LabelString {
    fn from(value: Vec<String>) -> Self {
        LabelString(value)
    }
}

impl IntoIterator for LabelString {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<String> for LabelString {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl Display for LabelString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
