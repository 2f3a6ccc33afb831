//! Two-level symbol table (C3): a global scope plus at most one nested
//! subroutine scope, with callable-only visibility leaking from the inner
//! scope out to the outer one.

#[cfg(test)]
mod tests;

/// The scalar/array shape of a value, plus whether the symbol-table entry it
/// is attached to denotes a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValType {
    pub base: BaseType,
    pub is_array: bool,
    pub is_callable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Integer,
    Boolean,
    None,
}

impl ValType {
    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            is_array: false,
            is_callable: false,
        }
    }

    pub const fn array(base: BaseType) -> Self {
        Self {
            base,
            is_array: true,
            is_callable: false,
        }
    }

    /// A callable's ValType: its base is the return type (`BaseType::None`
    /// for a procedure), never an array, always callable.
    pub const fn callable(base: BaseType) -> Self {
        Self {
            base,
            is_array: false,
            is_callable: true,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.is_callable
    }

    pub fn is_procedure(&self) -> bool {
        self.is_callable && matches!(self.base, BaseType::None)
    }

    pub fn is_function(&self) -> bool {
        self.is_callable && !matches!(self.base, BaseType::None)
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_array && !self.is_callable
    }

    /// The `ValType` of one element of an array with this base type.
    pub fn element_type(&self) -> ValType {
        ValType::scalar(self.base)
    }

    /// The `ValType` of the value produced by *calling* a callable with this
    /// `ValType` — same base and array-ness, but no longer itself callable.
    pub fn as_value(&self) -> ValType {
        ValType {
            base: self.base,
            is_array: self.is_array,
            is_callable: false,
        }
    }
}

impl std::fmt::Display for ValType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = match self.base {
            BaseType::Integer => "integer",
            BaseType::Boolean => "boolean",
            BaseType::None => "none",
        };
        if self.is_array {
            write!(f, "{} array", base)
        } else {
            write!(f, "{}", base)
        }
    }
}

/// Per-identifier property record owned exclusively by the symbol table; the
/// containing scope's close releases it.
#[derive(Debug, Clone, PartialEq)]
pub struct IdProp {
    pub val_type: ValType,
    /// Local-variable slot for a variable; `1` for a callable.
    pub offset: u32,
    pub param_count: u32,
    /// Populated only when `val_type.is_callable()`.
    pub param_types: Vec<ValType>,
}

impl IdProp {
    pub fn variable(val_type: ValType, offset: u32) -> Self {
        Self {
            val_type,
            offset,
            param_count: 0,
            param_types: Vec::new(),
        }
    }

    pub fn callable(val_type: ValType, param_types: Vec<ValType>) -> Self {
        let param_count = param_types.len() as u32;
        Self {
            val_type,
            offset: 1,
            param_count,
            param_types,
        }
    }
}

/// Largest prime below each power of two from 2^0 to 2^31, expressed as the
/// delta subtracted from that power. Scopes start sized at 2^5.
const PRIME_DELTAS: [u32; 32] = [
    0, 0, 1, 1, 3, 1, 3, 1, 5, 3, 3, 9, 3, 1, 3, 19, 15, 1, 5, 1, 3, 9, 3, 15, 3, 39, 5, 39, 57, 3,
    35, 1,
];

const INITIAL_SIZE_EXP: u32 = 5;

fn prime_table_size(exp: u32) -> usize {
    (1u64 << exp) as usize - PRIME_DELTAS[exp as usize] as usize
}

/// Scope-local hash table with chaining, keyed by identifier bytes.
///
/// Hash: for each byte `b`, `h := rotl(h, 5) + b`, then `h mod (size - 1)` —
/// note the modulus is `size - 1`, not `size`, so the last bucket index is
/// never produced.
struct Scope {
    buckets: Vec<Vec<(String, IdProp)>>,
    size_exp: u32,
    count: usize,
}

impl Scope {
    fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); prime_table_size(INITIAL_SIZE_EXP)],
            size_exp: INITIAL_SIZE_EXP,
            count: 0,
        }
    }

    fn bucket_index(name: &str, table_len: usize) -> usize {
        let mut h: u32 = 0;
        for &b in name.as_bytes() {
            h = h.rotate_left(5).wrapping_add(b as u32);
        }
        (h as usize) % (table_len - 1).max(1)
    }

    fn maybe_grow(&mut self) {
        if self.count as f64 <= 0.75 * self.buckets.len() as f64 {
            return;
        }
        self.size_exp += 1;
        let new_len = prime_table_size(self.size_exp);
        let mut new_buckets: Vec<Vec<(String, IdProp)>> = vec![Vec::new(); new_len];
        for chain in self.buckets.drain(..) {
            for (name, prop) in chain {
                let idx = Self::bucket_index(&name, new_len);
                new_buckets[idx].push((name, prop));
            }
        }
        self.buckets = new_buckets;
    }

    fn get(&self, name: &str) -> Option<&IdProp> {
        let idx = Self::bucket_index(name, self.buckets.len());
        self.buckets[idx]
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts `name`, failing (returning `false`) if already present in
    /// this scope.
    fn insert(&mut self, name: String, prop: IdProp) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.maybe_grow();
        let idx = Self::bucket_index(&name, self.buckets.len());
        self.buckets[idx].push((name, prop));
        self.count += 1;
        true
    }

    /// Highest offset assigned to any entry in this scope, plus one.
    fn locals_width(&self) -> u32 {
        self.buckets
            .iter()
            .flatten()
            .map(|(_, p)| p.offset)
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }
}

/// The two-level scope stack ALAN-2022 calls for. Implemented as a general
/// stack even though ALAN-2022 only ever nests to depth two: a lookup that
/// misses the innermost scope
/// keeps walking outward, but every scope past the innermost only yields a
/// match if that entry is callable.
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates the table with just the global scope open.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    /// Inserts `name` into the current (innermost) scope, then opens a fresh
    /// inner scope for the subroutine body. Fails if `name` already exists
    /// in the scope it is inserted into.
    pub fn open_subroutine(&mut self, name: &str, prop: IdProp) -> bool {
        let ok = self
            .scopes
            .last_mut()
            .expect("global scope always open")
            .insert(name.to_string(), prop);
        if ok {
            self.scopes.push(Scope::new());
        }
        ok
    }

    /// Opens a fresh inner scope without inserting anything into the outer
    /// one — used for the implicit top-level body, which (unlike a `function`
    /// or `call`-able procedure) is never itself looked up by name.
    pub fn open_top_level_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Discards the innermost scope (releasing all of its entries) and
    /// restores the scope below it as current.
    pub fn close_subroutine(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Inserts into the current scope; fails if `name` is already present
    /// there (the outer scope is not consulted).
    pub fn insert(&mut self, name: &str, prop: IdProp) -> bool {
        self.scopes
            .last_mut()
            .expect("global scope always open")
            .insert(name.to_string(), prop)
    }

    /// Looks up `name`: the innermost scope is searched unconditionally; any
    /// scope further out only yields a match if the entry is callable.
    pub fn find(&self, name: &str) -> Option<&IdProp> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(prop) = scope.get(name) {
                if depth == 0 || prop.val_type.is_callable() {
                    return Some(prop);
                }
            }
        }
        None
    }

    /// Highest offset assigned in the current scope, plus one — used by the
    /// emitter to size a subroutine's local-variable frame.
    pub fn current_locals_width(&self) -> u32 {
        self.scopes
            .last()
            .expect("global scope always open")
            .locals_width()
    }

    pub fn is_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Debug dump used by the CLI driver's `--dump-symbols`-style affordance;
    /// never touches the `.j` output contract.
    pub fn dump(&self) -> Vec<(String, ValType)> {
        self.scopes
            .iter()
            .flat_map(|s| s.buckets.iter())
            .flatten()
            .map(|(name, prop)| (name.clone(), prop.val_type))
            .collect()
    }
}

#[cfg(test)]
mod prime_table_tests {
    use super::*;

    fn is_prime(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let mut i = 2;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    #[test]
    fn every_table_size_is_prime() {
        for exp in 5..=20 {
            let size = prime_table_size(exp);
            assert!(is_prime(size as u64), "2^{} - delta = {} is not prime", exp, size);
        }
    }
}
