//! Unit tests for threshold routing

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::model::{AnimalEntry, Rate};

    fn entry(name: &str, rarity: &str, value: Option<f64>) -> AnimalEntry {
        AnimalEntry {
            location: "Plot 1".to_string(),
            index: 1u64.into(),
            name: name.to_string(),
            mutation: String::new(),
            rarity: rarity.to_string(),
            value,
        }
    }

    fn public_bounds() -> ThresholdBounds {
        ThresholdBounds {
            min_secret: Some(300_000.0),
            max_secret: Some(5_000_000.0),
            min_non_secret: Some(500_000.0),
            max_non_secret: Some(5_000_000.0),
        }
    }

    #[test]
    fn test_rarity_class() {
        assert_eq!(RarityClass::of("Secret"), RarityClass::Secret);
        assert_eq!(RarityClass::of("secret"), RarityClass::NonSecret);
        assert_eq!(RarityClass::of("Mythic"), RarityClass::NonSecret);
        assert_eq!(RarityClass::of(""), RarityClass::NonSecret);
    }

    #[test]
    fn test_secret_minimum_boundary() {
        let channel = ChannelConfig::new(
            "Public",
            ThresholdBounds {
                min_secret: Some(300_000.0),
                ..ThresholdBounds::default()
            },
        );
        assert!(!channel.admits(250_000.0, "Secret"));
        assert!(channel.admits(300_000.0, "Secret"));
    }

    #[test]
    fn test_bounds_are_per_class() {
        let bounds = public_bounds();
        assert!(bounds.admits(400_000.0, RarityClass::Secret));
        assert!(!bounds.admits(400_000.0, RarityClass::NonSecret));
        assert!(bounds.admits(5_000_000.0, RarityClass::NonSecret));
        assert!(!bounds.admits(5_000_001.0, RarityClass::NonSecret));
    }

    #[test]
    fn test_unbounded_channel_admits_everything() {
        let bounds = ThresholdBounds::default();
        assert!(bounds.admits(0.0, RarityClass::Secret));
        assert!(bounds.admits(f64::MAX, RarityClass::NonSecret));
    }

    #[test]
    fn test_classify_returns_every_matching_channel() {
        let channels = vec![
            ChannelConfig::new("Public", public_bounds()),
            ChannelConfig::new(
                "+5M",
                ThresholdBounds {
                    min_secret: Some(5_000_000.0),
                    min_non_secret: Some(5_000_000.0),
                    ..ThresholdBounds::default()
                },
            ),
        ];
        let names = |v: Vec<&ChannelConfig>| v.into_iter().map(|c| c.name.clone()).collect::<Vec<_>>();

        assert_eq!(names(classify(1_000_000.0, "Secret", &channels)), vec!["Public"]);
        assert_eq!(names(classify(5_000_000.0, "Secret", &channels)), vec!["Public", "+5M"]);
        assert_eq!(names(classify(9_000_000.0, "Mythic", &channels)), vec!["+5M"]);
        assert!(classify(100.0, "Mythic", &channels).is_empty());
    }

    #[test]
    fn test_resolve_value_prefers_number_and_parses_text() {
        let numeric = Generation {
            per_second: Some(Rate::Number(1234.0)),
            ..Generation::default()
        };
        assert_eq!(resolve_value(&numeric), Some(1234.0));

        let text = Generation {
            per_second: Some(Rate::Text("$750K/s".to_string())),
            ..Generation::default()
        };
        assert_eq!(resolve_value(&text), Some(750_000.0));

        assert_eq!(resolve_value(&Generation::default()), None);
    }

    #[test]
    fn test_route_skips_disabled_channels_and_unvalued_entries() {
        let router = ThresholdRouter::new(
            vec![
                ChannelConfig::new("Off", ThresholdBounds::default()),
                ChannelConfig::new("On", ThresholdBounds::default()).with_webhook("http://hook"),
            ],
            RoutingMode::Broadcast,
        );
        let batches = router.route(&[entry("A", "Secret", Some(1.0)), entry("B", "Secret", None)]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].channel.name, "On");
        assert_eq!(batches[0].items.len(), 1);
        assert_eq!(batches[0].items[0].name, "A");
    }

    #[test]
    fn test_blank_webhook_is_disabled() {
        let channel = ChannelConfig::new("Blank", ThresholdBounds::default()).with_webhook("  ");
        assert!(!channel.is_enabled());
    }

    #[test]
    fn test_broadcast_mode_copies_to_all_matches() {
        let router = ThresholdRouter::new(
            vec![
                ChannelConfig::new("A", ThresholdBounds::default()).with_webhook("http://a"),
                ChannelConfig::new("B", ThresholdBounds::default()).with_webhook("http://b"),
            ],
            RoutingMode::Broadcast,
        );
        let batches = router.route(&[entry("X", "Epic", Some(10.0))]);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_first_match_mode_delivers_once() {
        let router = ThresholdRouter::new(
            vec![
                ChannelConfig::new("A", ThresholdBounds::default()).with_webhook("http://a"),
                ChannelConfig::new("B", ThresholdBounds::default()).with_webhook("http://b"),
            ],
            RoutingMode::FirstMatch,
        );
        let batches = router.route(&[entry("X", "Epic", Some(10.0))]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].channel.name, "A");
    }

    #[test]
    fn test_first_match_falls_through_to_next_admitting_channel() {
        let router = ThresholdRouter::new(
            vec![
                ChannelConfig::new(
                    "High",
                    ThresholdBounds {
                        min_non_secret: Some(1_000.0),
                        ..ThresholdBounds::default()
                    },
                )
                .with_webhook("http://high"),
                ChannelConfig::new("Any", ThresholdBounds::default()).with_webhook("http://any"),
            ],
            RoutingMode::FirstMatch,
        );
        let batches = router.route(&[entry("Low", "Epic", Some(10.0)), entry("Big", "Epic", Some(5_000.0))]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].items[0].name, "Big");
        assert_eq!(batches[1].items[0].name, "Low");
    }

    #[test]
    fn test_channel_label_falls_back_to_name() {
        let mut channel = ChannelConfig::new("Public", ThresholdBounds::default());
        assert_eq!(channel.label(), "Public");
        channel.badge = Some("Finder".to_string());
        assert_eq!(channel.label(), "Finder");
    }

    #[test]
    fn test_routing_mode_serialization() {
        assert_eq!(serde_json::to_string(&RoutingMode::FirstMatch).unwrap(), "\"first_match\"");
        let mode: RoutingMode = serde_json::from_str("\"broadcast\"").unwrap();
        assert_eq!(mode, RoutingMode::Broadcast);
    }
}
