//! Interned attribute names.
//!
//! Attribute sets are keyed and ordered by [`Symbol`], never by string
//! content. The table is append-only: a symbol stays valid for as long as
//! the evaluator that produced it, and there is no per-symbol release.

use std::ffi::CStr;
use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Interned name identifier.
///
/// Symbols compare and order by interning order, which is also the
/// canonical iteration order of attribute sets.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// Create from a raw `u32` value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Symbol(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Error when interning a name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// The name embeds a NUL byte, which the C boundary uses as terminator.
    InteriorNul { position: usize },
    /// The table already holds `u32::MAX` names.
    Overflow { count: usize },
}

impl fmt::Display for InternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternError::InteriorNul { position } => {
                write!(f, "symbol name contains a NUL byte at offset {position}")
            }
            InternError::Overflow { count } => write!(
                f,
                "symbol table exceeded capacity: {count} names, max is {}",
                u32::MAX
            ),
        }
    }
}

impl std::error::Error for InternError {}

/// Both renderings of one interned name.
///
/// The C string is what the boundary hands out; keeping it next to the
/// text means `ferry_attr_iter_key` never allocates.
#[derive(Clone)]
struct SymbolName {
    text: Arc<str>,
    c_text: Arc<CStr>,
}

/// Append-only name table owned by one evaluator.
#[derive(Default)]
pub struct SymbolTable {
    map: FxHashMap<Arc<str>, Symbol>,
    names: Vec<SymbolName>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to intern a name, returning its symbol or an error.
    pub fn try_intern(&mut self, name: &str) -> Result<Symbol, InternError> {
        if let Some(&symbol) = self.map.get(name) {
            return Ok(symbol);
        }

        let c_text = CString::new(name).map_err(|err| InternError::InteriorNul {
            position: err.nul_position(),
        })?;
        let raw = u32::try_from(self.names.len())
            .ok()
            .filter(|&raw| raw < u32::MAX)
            .ok_or(InternError::Overflow {
                count: self.names.len(),
            })?;

        let symbol = Symbol(raw);
        let text: Arc<str> = Arc::from(name);
        self.names.push(SymbolName {
            text: Arc::clone(&text),
            c_text: Arc::from(c_text),
        });
        self.map.insert(text, symbol);

        tracing::trace!(name, symbol = raw, "interned symbol");
        Ok(symbol)
    }

    /// Intern a name, returning its symbol.
    ///
    /// # Panics
    /// Panics if the name contains a NUL byte or the table is full. Use
    /// [`SymbolTable::try_intern`] for fallible interning.
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.try_intern(name).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Look up an already interned name without growing the table.
    pub fn find(&self, name: &str) -> Option<Symbol> {
        self.map.get(name).copied()
    }

    /// Look up the text of a symbol.
    ///
    /// # Panics
    /// Panics if the symbol was not produced by this table.
    pub fn name(&self, symbol: Symbol) -> &str {
        &self.entry(symbol).text
    }

    /// Shared handle to the text of a symbol.
    pub fn name_arc(&self, symbol: Symbol) -> Arc<str> {
        Arc::clone(&self.entry(symbol).text)
    }

    /// Shared handle to the NUL-terminated text of a symbol.
    ///
    /// The table keeps its own reference, so the pointer stays valid for
    /// the lifetime of the table even after the returned `Arc` is dropped.
    pub fn c_name(&self, symbol: Symbol) -> Arc<CStr> {
        Arc::clone(&self.entry(symbol).c_text)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn entry(&self, symbol: Symbol) -> &SymbolName {
        self.names
            .get(symbol.index())
            .unwrap_or_else(|| panic!("{symbol:?} does not belong to this symbol table"))
    }
}

#[cfg(test)]
mod tests;
