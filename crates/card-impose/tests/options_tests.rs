use card_impose::*;

#[test]
fn test_default_layout_is_a4_portrait() {
    let options = LayoutOptions::default();
    let (width, height) = options.page_size_pt();
    assert!((width - constants::A4_WIDTH_PT).abs() < 0.01);
    assert!((height - constants::A4_HEIGHT_PT).abs() < 0.01);
    assert_eq!(options.margin_pt, 20.0);
    assert!(options.validate().is_ok());
}

#[test]
fn test_layout_validation_rejects_oversized_margin() {
    let options = LayoutOptions {
        margin_pt: 400.0,
        ..LayoutOptions::default()
    };
    match options.validate() {
        Err(ImposeError::Config(msg)) => assert!(msg.contains("Margin")),
        _ => panic!("Expected Config error"),
    }
}

#[test]
fn test_layout_plan_uses_page_setup() {
    let plan = LayoutOptions::default().plan(1.6);
    assert_eq!(plan.cards_per_page, 12);
    assert_eq!(plan.margin, 20.0);
}

#[test]
fn test_quality_tiers() {
    assert_eq!(ConversionQuality::High.dpi(), 300);
    assert_eq!(ConversionQuality::Medium.dpi(), 150);
    assert_eq!(ConversionQuality::Low.dpi(), 72);
}

#[test]
fn test_cmyk_options_validation() {
    assert!(CmykOptions::default().validate().is_ok());
    let options = CmykOptions {
        timeout_secs: 0,
        ..CmykOptions::default()
    };
    assert!(options.validate().is_err());
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_layout_options_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");

    let options = LayoutOptions {
        paper: PaperSize::Letter,
        orientation: Orientation::Landscape,
        margin_pt: 36.0,
    };
    options.save(&path).await.unwrap();

    let loaded = LayoutOptions::load(&path).await.unwrap();
    assert_eq!(loaded, options);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_cmyk_options_partial_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmyk.json");
    std::fs::write(&path, r#"{ "quality": "low", "binary": "/usr/local/bin/gs" }"#).unwrap();

    let loaded = CmykOptions::load(&path).await.unwrap();
    assert_eq!(loaded.quality, ConversionQuality::Low);
    assert_eq!(loaded.binary, "/usr/local/bin/gs");
    assert_eq!(loaded.timeout_secs, constants::DEFAULT_CONVERSION_TIMEOUT_SECS);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        LayoutOptions::load(&path).await,
        Err(ImposeError::Config(_))
    ));
}
