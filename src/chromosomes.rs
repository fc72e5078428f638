use rustc_hash::FxHashMap;

/// Factorizes chromosome names into dense `i64` codes.
///
/// Codes are handed out in first-seen order, so a chromosome-sorted stream
/// keeps its chromosome order when sorted by code.
#[derive(Debug, Default, Clone)]
pub struct ChromosomeCodes {
    codes: FxHashMap<String, i64>,
    names: Vec<String>,
}

impl ChromosomeCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, name: &str) -> i64 {
        if let Some(&code) = self.codes.get(name) {
            return code;
        }
        let code = self.names.len() as i64;
        self.codes.insert(name.to_string(), code);
        self.names.push(name.to_string());
        code
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.codes.get(name).copied()
    }

    /// Name for `code`; unknown codes render as `"?"`.
    pub fn name(&self, code: i64) -> &str {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
