//! Weighted-penalty matching of concrete fonts against wanted attributes

use tracing::{debug, trace};

use crate::attributes::{Slant, Weight};
use crate::constants::PREFERRED_CHARSETS;
use crate::encoding::charset_alias;
use crate::traits::{FontBackend, FontDescriptor};
use crate::xlfd::SetWidth;

// Penalty weights. Family and charset mismatches dominate everything else.
const FOUNDRY_PENALTY: u32 = 4500;
const FAMILY_PENALTY: u32 = 9000;
const WEIGHT_PENALTY: u32 = 90;
const SLANT_PENALTY: u32 = 60;
const XLFD_SLANT_PENALTY: u32 = 10;
const SET_WIDTH_PENALTY: u32 = 1000;
const SCALABLE_PENALTY: u32 = 10;
const TOO_LARGE_PENALTY: u32 = 600;
const TOO_SMALL_PENALTY: u32 = 150;
const PER_PIXEL_PENALTY: u32 = 150;
const CHARSET_PENALTY: u32 = 65000;
const CHARSET_ALIAS_PENALTY: u32 = 30000;
const CHARSET_RANK_PENALTY: u32 = 20000;

/// The attributes compared by [`rank`], on either side of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAttributes {
    pub family: String,
    pub foundry: Option<String>,
    pub weight: Weight,
    /// Three-way slant.
    pub slant: Slant,
    pub set_width: SetWidth,
    /// `None` on the candidate side means scalable.
    pub pixel_size: Option<u32>,
    pub charset: String,
}

impl MatchAttributes {
    pub fn from_descriptor(descriptor: &FontDescriptor) -> Self {
        Self {
            family: descriptor.face.clone(),
            foundry: descriptor.foundry.clone(),
            weight: descriptor.weight,
            slant: descriptor.slant,
            set_width: descriptor.set_width,
            pixel_size: descriptor.pixel_size,
            charset: descriptor.charset.clone(),
        }
    }
}

/// Penalty for using `got` when `want` was asked for. Zero only for an exact
/// match.
pub fn rank(want: &MatchAttributes, got: &MatchAttributes) -> u32 {
    let mut penalty: u32 = 0;
    if got.foundry != want.foundry {
        penalty += FOUNDRY_PENALTY;
    }
    if !got.family.eq_ignore_ascii_case(&want.family) {
        penalty += FAMILY_PENALTY;
    }
    if got.weight != want.weight {
        penalty += WEIGHT_PENALTY;
    }
    if got.slant.folded() != want.slant.folded() {
        penalty += SLANT_PENALTY;
    }
    if got.slant != want.slant {
        penalty += XLFD_SLANT_PENALTY;
    }
    if got.set_width != want.set_width {
        penalty += SET_WIDTH_PENALTY;
    }

    match (got.pixel_size, want.pixel_size) {
        (None, _) => penalty += SCALABLE_PENALTY,
        (Some(got_px), want_px) => {
            let diff = got_px as i64 - want_px.unwrap_or(got_px) as i64;
            // A glyph that is too large hurts more than one that is too small.
            if diff > 0 {
                penalty += TOO_LARGE_PENALTY;
            } else if diff < 0 {
                penalty += TOO_SMALL_PENALTY;
            }
            let pixels = diff.unsigned_abs().min(u32::MAX as u64) as u32;
            penalty = penalty.saturating_add(PER_PIXEL_PENALTY.saturating_mul(pixels));
        }
    }

    if !got.charset.eq_ignore_ascii_case(&want.charset) {
        penalty += CHARSET_PENALTY;
        let got_alias = charset_alias(&got.charset);
        let want_alias = charset_alias(&want.charset);
        if got_alias != want_alias {
            penalty += CHARSET_ALIAS_PENALTY;
            for preferred in PREFERRED_CHARSETS {
                if got_alias == *preferred {
                    penalty -= CHARSET_ALIAS_PENALTY;
                    break;
                }
                penalty += CHARSET_RANK_PENALTY;
            }
        }
    }
    penalty
}

/// Index and penalty of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored {
    pub index: usize,
    pub score: u32,
}

/// The best fixed-size and the best scalable candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestCandidates {
    pub fixed: Option<Scored>,
    pub scalable: Option<Scored>,
}

impl BestCandidates {
    pub fn is_empty(&self) -> bool {
        self.fixed.is_none() && self.scalable.is_none()
    }
}

/// Ranks every candidate. Ties go to the first candidate encountered, and
/// an exact match stops the scan.
pub fn select_best(candidates: &[FontDescriptor], want: &MatchAttributes) -> BestCandidates {
    let mut best = BestCandidates::default();
    for (index, candidate) in candidates.iter().enumerate() {
        let score = rank(want, &MatchAttributes::from_descriptor(candidate));
        trace!("Candidate {:?} scored {}", candidate.native_name, score);
        let slot = if candidate.is_scalable() {
            &mut best.scalable
        } else {
            &mut best.fixed
        };
        if slot.map_or(true, |s| score < s.score) {
            *slot = Some(Scored { index, score });
        }
        if score == 0 {
            break;
        }
    }
    best
}

/// Loads the better of the two candidates, trying the other when loading
/// fails. The scalable candidate is loaded at `pixel_size` and only wins
/// with a strictly lower penalty.
pub fn materialize<'c, B: FontBackend>(
    backend: &B,
    candidates: &'c [FontDescriptor],
    best: BestCandidates,
    pixel_size: u32,
) -> Option<(B::Resource, &'c FontDescriptor)> {
    let mut best = best;
    loop {
        let fixed_score = best.fixed.map_or(u32::MAX, |s| s.score);
        match (best.scalable, best.fixed) {
            (Some(scalable), _) if scalable.score < fixed_score || best.fixed.is_none() => {
                let descriptor = &candidates[scalable.index];
                if let Some(resource) = backend.load_concrete_font(descriptor, pixel_size) {
                    return Some((resource, descriptor));
                }
                debug!("Scalable {:?} failed at {}px", descriptor.native_name, pixel_size);
                best.scalable = None;
            }
            (_, Some(fixed)) => {
                let descriptor = &candidates[fixed.index];
                let size = descriptor.pixel_size.unwrap_or(pixel_size);
                if let Some(resource) = backend.load_concrete_font(descriptor, size) {
                    return Some((resource, descriptor));
                }
                debug!("Fixed {:?} failed to load", descriptor.native_name);
                best.fixed = None;
            }
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn want() -> MatchAttributes {
        MatchAttributes {
            family: "helvetica".to_string(),
            foundry: Some("adobe".to_string()),
            weight: Weight::Normal,
            slant: Slant::Roman,
            set_width: SetWidth::Normal,
            pixel_size: Some(12),
            charset: "iso8859-1".to_string(),
        }
    }

    #[test]
    fn test_exact_match_is_zero() {
        assert_eq!(rank(&want(), &want()), 0);
    }

    #[test]
    fn test_each_mismatch_increases_penalty() {
        let w = want();
        let variants: Vec<MatchAttributes> = vec![
            MatchAttributes { foundry: None, ..w.clone() },
            MatchAttributes { family: "times".into(), ..w.clone() },
            MatchAttributes { weight: Weight::Bold, ..w.clone() },
            MatchAttributes { slant: Slant::Italic, ..w.clone() },
            MatchAttributes { slant: Slant::Oblique, ..w.clone() },
            MatchAttributes { set_width: SetWidth::Condensed, ..w.clone() },
            MatchAttributes { pixel_size: None, ..w.clone() },
            MatchAttributes { pixel_size: Some(14), ..w.clone() },
            MatchAttributes { pixel_size: Some(10), ..w.clone() },
            MatchAttributes { charset: "iso8859-7".into(), ..w.clone() },
        ];
        for got in variants {
            assert!(rank(&w, &got) > 0, "{:?}", got);
        }
    }

    #[test]
    fn test_family_name_is_case_insensitive() {
        let got = MatchAttributes { family: "Helvetica".into(), ..want() };
        assert_eq!(rank(&want(), &got), 0);
    }

    #[test]
    fn test_size_penalties() {
        let w = want();
        let larger = MatchAttributes { pixel_size: Some(13), ..w.clone() };
        let smaller = MatchAttributes { pixel_size: Some(11), ..w.clone() };
        let scalable = MatchAttributes { pixel_size: None, ..w.clone() };
        assert_eq!(rank(&w, &larger), 600 + 150);
        assert_eq!(rank(&w, &smaller), 150 + 150);
        assert_eq!(rank(&w, &scalable), 10);
    }

    #[test]
    fn test_charset_penalties() {
        let w = want();
        // Same alias: only the base charset penalty.
        let ucs = MatchAttributes { charset: "ucs-2be".into(), ..w.clone() };
        let iso10646 = MatchAttributes { charset: "iso10646-1".into(), ..w.clone() };
        assert_eq!(rank(&ucs, &iso10646), 65000);
        // Preferred charset at position 1 in the list.
        let jis = MatchAttributes { charset: "jisx0208.1983-0".into(), ..w.clone() };
        assert_eq!(rank(&w, &jis), 65000 + 20000);
        // Not preferred at all.
        let koi = MatchAttributes { charset: "koi8-r".into(), ..w.clone() };
        assert_eq!(rank(&w, &koi), 65000 + 30000 + 3 * 20000);
    }

    #[test]
    fn test_select_best_tracks_fixed_and_scalable() {
        let candidates = vec![
            FontDescriptor::scalable("helvetica", "iso8859-1").with_foundry("adobe"),
            FontDescriptor::scalable("helvetica", "iso8859-1")
                .with_foundry("adobe")
                .with_pixel_size(14),
            FontDescriptor::scalable("helvetica", "iso8859-1")
                .with_foundry("adobe")
                .with_pixel_size(11),
        ];
        let best = select_best(&candidates, &want());
        assert_eq!(best.scalable, Some(Scored { index: 0, score: 10 }));
        assert_eq!(best.fixed, Some(Scored { index: 2, score: 300 }));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let candidates = vec![
            FontDescriptor::scalable("helvetica", "iso8859-1").with_weight(Weight::Bold),
            FontDescriptor::scalable("helvetica", "iso8859-1").with_slant(Slant::Italic),
        ];
        let w = MatchAttributes { foundry: None, ..want() };
        let best = select_best(&candidates, &w);
        // Bold costs 90 + 10, italic 60 + 10 + 10.
        assert_eq!(best.scalable.map(|s| s.index), Some(1));

        let same = vec![
            FontDescriptor::scalable("helvetica", "iso8859-1").with_native_name("first"),
            FontDescriptor::scalable("helvetica", "iso8859-1").with_native_name("second"),
        ];
        assert_eq!(select_best(&same, &w).scalable.map(|s| s.index), Some(0));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(select_best(&[], &want()).is_empty());
    }
}
