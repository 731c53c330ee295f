use crate::models::Reciter;

/// Normalized reciter list.
///
/// Names are unique: the first record with a given name wins. The provider
/// always appends one record that is not a reciter; it is dropped after the
/// name de-duplication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReciterRegistry {
    reciters: Vec<Reciter>,
}

impl ReciterRegistry {
    pub fn from_fetched(fetched: Vec<Reciter>) -> Self {
        let mut reciters: Vec<Reciter> = Vec::with_capacity(fetched.len());
        for reciter in fetched {
            if !reciters.iter().any(|r| r.name == reciter.name) {
                reciters.push(reciter);
            }
        }
        reciters.pop();
        Self { reciters }
    }

    pub fn len(&self) -> usize {
        self.reciters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reciters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reciter> {
        self.reciters.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Reciter> {
        self.reciters.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Reciter> {
        self.reciters.iter().find(|r| r.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.reciters.iter().position(|r| r.name == name)
    }

    /// Look up the configured default; surrounding whitespace in the setting is ignored.
    pub fn resolve_default(&self, name: &str) -> Option<&Reciter> {
        self.by_name(name.trim())
    }
}
