// tests/family_cache.rs
//! Family sharing and coverage caching across font objects

use fontweave::weave_core::dummy_backend::DummyBackend;
use fontweave::weave_core::{FamilyCache, FamilyIdentity};
use fontweave::weave_core::font::coverage::CoverageStrategy;
use fontweave::weave_core::font::family::FamilyTraits;
use fontweave::weave_core::Encoding;
use fontweave::{EnvironmentConfig, FontEnvironment};

fn latin_traits() -> FamilyTraits {
    FamilyTraits {
        encoding: Encoding::Latin1,
        strategy: CoverageStrategy::DeclaredEncoding(Encoding::Latin1),
        is_symbol: false,
    }
}

#[test]
fn test_supports_is_idempotent_and_cached() {
    let mut cache = FamilyCache::new();
    let id = cache.acquire(FamilyIdentity::new("Times", None, "iso8859-1"), latin_traits);

    for cp in [0x41u32, 0xE9, 0x410, 0x2FFFF] {
        let first = cache.supports(id, cp);
        let loads = cache.page_loads(id);
        assert_eq!(cache.supports(id, cp), first, "U+{:04X}", cp);
        assert_eq!(cache.page_loads(id), loads);
    }
    // 0x41 and 0xE9 share the first page.
    assert_eq!(cache.page_loads(id), 3);
}

#[test]
fn test_refcounts_balance_with_keep_alive() {
    let mut cache = FamilyCache::new();
    let identity = FamilyIdentity::new("Courier", Some("adobe"), "iso8859-1");

    let id = cache.acquire(identity.clone(), latin_traits);
    for _ in 0..4 {
        assert_eq!(cache.acquire(identity.clone(), latin_traits), id);
    }
    for _ in 0..5 {
        assert!(!cache.release(id));
    }
    // Only the keep-alive reference is left.
    assert_eq!(cache.ref_count(&identity), Some(1));
    assert!(cache.contains(&identity));

    assert!(cache.release(id));
    assert!(!cache.contains(&identity));
    assert!(cache.is_empty());
}

#[test]
fn test_fonts_share_families() {
    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let small = env.get_font("Helvetica 10").unwrap();
    let large = env.get_font("Helvetica 24").unwrap();
    assert_ne!(small, large);

    let family = env.subfont_families(small).unwrap()[0];
    assert_eq!(env.subfont_families(large).unwrap()[0], family);
    let identity = env.family_cache().get(family).unwrap().identity.clone();
    assert_eq!(env.family_cache().ref_count(&identity), Some(3));

    env.release(small).unwrap();
    env.release(large).unwrap();
    assert_eq!(env.family_cache().ref_count(&identity), Some(1));
}

#[test]
fn test_coverage_survives_font_churn() {
    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let font = env.get_font("Helvetica 12").unwrap();
    env.resolve_char(font, '\u{3b1}').unwrap();
    let dejavu = env.subfont_families(font).unwrap()[1];
    let loads = env.family_cache().page_loads(dejavu);
    env.release(font).unwrap();

    // The family was kept alive, so its computed pages are reused.
    let font = env.get_font("Helvetica 12").unwrap();
    env.resolve_char(font, '\u{3b1}').unwrap();
    assert_eq!(env.subfont_families(font).unwrap()[1], dejavu);
    assert_eq!(env.family_cache().page_loads(dejavu), loads);
}
