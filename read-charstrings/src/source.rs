//! Access to the font data consumed by the interpreter.

use alloc::{collections::BTreeMap, vec::Vec};

use super::PrivateDict;

/// The charstring format of a font.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharstringKind {
    /// Type 1 charstrings, as found in Type 1 fonts.
    ///
    /// See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf>
    Type1,
    /// Type 2 charstrings, as found in CFF fonts.
    ///
    /// See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>
    Type2,
}

/// Source of the charstring data for a single font.
///
/// Implementations hand out raw (still encrypted for Type 1) charstrings.
/// Subroutine indices are unbiased: the interpreter applies the Type 2
/// bias before calling [`subr`](Self::subr) and
/// [`global_subr`](Self::global_subr).
pub trait CharstringSource {
    /// Format of the charstrings in this font.
    fn kind(&self) -> CharstringKind;

    /// Private dictionary containing hinting parameters.
    fn private_dict(&self) -> &PrivateDict;

    /// Number of local subroutines.
    fn subr_count(&self) -> usize;

    /// Returns the local subroutine at the given index.
    fn subr(&self, index: usize) -> Option<&[u8]>;

    /// Number of global subroutines (Type 2 only).
    fn global_subr_count(&self) -> usize {
        0
    }

    /// Returns the global subroutine at the given index.
    fn global_subr(&self, index: usize) -> Option<&[u8]> {
        let _ = index;
        None
    }

    /// Returns the charstring for the glyph mapped to the given code in
    /// the Adobe StandardEncoding, for use as a seac component.
    fn seac_component(&self, code: i32) -> Option<&[u8]>;
}

/// Returns the bias applied to Type 2 subroutine numbers for a subroutine
/// table of the given size.
///
/// See "4.7 Subroutine Operators" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=29>
pub fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

/// Font with all charstring data held in memory.
#[derive(Clone, Debug)]
pub struct CharstringFont {
    kind: CharstringKind,
    private_dict: PrivateDict,
    subrs: Vec<Vec<u8>>,
    global_subrs: Vec<Vec<u8>>,
    seac_components: BTreeMap<i32, Vec<u8>>,
}

impl CharstringFont {
    pub fn new(kind: CharstringKind, private_dict: PrivateDict) -> Self {
        Self {
            kind,
            private_dict,
            subrs: Vec::new(),
            global_subrs: Vec::new(),
            seac_components: BTreeMap::new(),
        }
    }

    pub fn with_subrs(mut self, subrs: Vec<Vec<u8>>) -> Self {
        self.subrs = subrs;
        self
    }

    pub fn with_global_subrs(mut self, global_subrs: Vec<Vec<u8>>) -> Self {
        self.global_subrs = global_subrs;
        self
    }

    /// Registers the charstring for the glyph with the given
    /// StandardEncoding code.
    pub fn with_seac_component(mut self, code: i32, charstring: Vec<u8>) -> Self {
        self.seac_components.insert(code, charstring);
        self
    }

    pub fn private_dict_mut(&mut self) -> &mut PrivateDict {
        &mut self.private_dict
    }
}

impl CharstringSource for CharstringFont {
    fn kind(&self) -> CharstringKind {
        self.kind
    }

    fn private_dict(&self) -> &PrivateDict {
        &self.private_dict
    }

    fn subr_count(&self) -> usize {
        self.subrs.len()
    }

    fn subr(&self, index: usize) -> Option<&[u8]> {
        self.subrs.get(index).map(|subr| subr.as_slice())
    }

    fn global_subr_count(&self) -> usize {
        self.global_subrs.len()
    }

    fn global_subr(&self, index: usize) -> Option<&[u8]> {
        self.global_subrs.get(index).map(|subr| subr.as_slice())
    }

    fn seac_component(&self, code: i32) -> Option<&[u8]> {
        self.seac_components.get(&code).map(|cs| cs.as_slice())
    }
}

impl<T: CharstringSource + ?Sized> CharstringSource for &T {
    fn kind(&self) -> CharstringKind {
        (**self).kind()
    }

    fn private_dict(&self) -> &PrivateDict {
        (**self).private_dict()
    }

    fn subr_count(&self) -> usize {
        (**self).subr_count()
    }

    fn subr(&self, index: usize) -> Option<&[u8]> {
        (**self).subr(index)
    }

    fn global_subr_count(&self) -> usize {
        (**self).global_subr_count()
    }

    fn global_subr(&self, index: usize) -> Option<&[u8]> {
        (**self).global_subr(index)
    }

    fn seac_component(&self, code: i32) -> Option<&[u8]> {
        (**self).seac_component(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias() {
        assert_eq!(subr_bias(0), 107);
        assert_eq!(subr_bias(1239), 107);
        assert_eq!(subr_bias(1240), 1131);
        assert_eq!(subr_bias(33899), 1131);
        assert_eq!(subr_bias(33900), 32768);
    }

    #[test]
    fn memory_font_lookup() {
        let font = CharstringFont::new(CharstringKind::Type2, PrivateDict::default())
            .with_subrs(vec![vec![11]])
            .with_global_subrs(vec![vec![1, 2], vec![11]])
            .with_seac_component(65, vec![14]);
        assert_eq!(font.subr(0), Some(&[11u8][..]));
        assert_eq!(font.subr(1), None);
        assert_eq!(font.global_subr_count(), 2);
        assert_eq!(font.seac_component(65), Some(&[14u8][..]));
        assert_eq!(font.seac_component(66), None);
        // by reference
        let by_ref = &font;
        assert_eq!(by_ref.kind(), CharstringKind::Type2);
    }
}
