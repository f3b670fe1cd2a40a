use std::collections::HashMap;

/// Handle to a string interned in a [`StringPool`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    /// The id reserved for SQL `NULL`.
    pub const NULL: StringId = StringId(0);

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// Append-only interner mapping strings to dense ids.
///
/// Id `0` is reserved for `NULL` and resolves to no string.
#[derive(Debug, Clone)]
pub struct StringPool {
    strings: Vec<Box<str>>,
    ids: HashMap<Box<str>, StringId>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self {
            strings: vec![Box::from("")],
            ids: HashMap::new(),
        }
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `value`, interning it if it was not seen before.
    pub fn intern(&mut self, value: &str) -> StringId {
        if let Some(id) = self.ids.get(value) {
            return *id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(Box::from(value));
        self.ids.insert(Box::from(value), id);
        id
    }

    /// Interns `value`, mapping `None` to [`StringId::NULL`].
    pub fn intern_nullable(&mut self, value: Option<&str>) -> StringId {
        value.map_or(StringId::NULL, |v| self.intern(v))
    }

    /// Looks up an id; `None` for the null id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this pool.
    pub fn get(&self, id: StringId) -> Option<&str> {
        if id.is_null() {
            return None;
        }
        Some(&self.strings[id.0 as usize])
    }

    /// Id of an already interned string.
    pub fn get_id(&self, value: &str) -> Option<StringId> {
        self.ids.get(value).copied()
    }

    /// One past the largest id handed out, counting the null id.
    pub fn len(&self) -> u32 {
        self.strings.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() == 1
    }

    /// Non-null entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (StringId, &str)> + '_ {
        self.strings
            .iter()
            .enumerate()
            .skip(1)
            .map(|(id, s)| (StringId(id as u32), &**s))
    }
}
