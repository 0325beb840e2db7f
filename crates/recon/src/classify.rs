use crate::config::{DivisionRule, ProductRule, RuleConfig};
use crate::model::{Channel, Division, Market};

// ---------------------------------------------------------------------------
// Ordered rule evaluation
// ---------------------------------------------------------------------------

/// First division rule whose substring list hits wins; no hit degrades to
/// `Other`, never an error. Case-sensitive containment by contract: the
/// rule tables are written against title-cased upstream labels.
pub fn classify_division(rules: &[DivisionRule], label: &str) -> Division {
    for rule in rules {
        if rule.any_of.iter().any(|p| label.contains(p.as_str())) {
            return rule.division;
        }
    }
    Division::Other
}

/// Collapse a source product name to its canonical product, or "Other".
pub fn classify_product(rules: &[ProductRule], product_raw: &str) -> String {
    let label = product_raw.trim();
    for rule in rules {
        if rule.equals.iter().any(|p| label == p)
            || rule.contains.iter().any(|p| label.contains(p.as_str()))
        {
            return rule.product.clone();
        }
    }
    "Other".into()
}

/// Base division for a spend record: the upstream tab tag when the extract
/// carries one, else the product/campaign rule tables.
pub fn division_for_record(
    config: &RuleConfig,
    product: &str,
    campaign_raw: &str,
    source_tag: Option<&str>,
) -> Division {
    if let Some(tag) = source_tag {
        if let Some(division) = Division::parse_label(tag) {
            return division;
        }
    }
    match classify_division(&config.division_rules, product) {
        Division::Other => classify_division(&config.division_rules, campaign_raw),
        division => division,
    }
}

/// Media-code to channel mapping. Paid-search client codes take precedence
/// over any media rule; unmapped codes pass through as their own channel.
pub fn classify_channel(
    config: &RuleConfig,
    media_code: &str,
    campaign_raw: &str,
    client_code: &str,
) -> Channel {
    if config.paid_search_clients.iter().any(|c| c == client_code) {
        return Channel::Search;
    }
    let code = media_code.trim();
    let campaign_upper = campaign_raw.to_uppercase();
    for rule in &config.channel_rules {
        if code == rule.code {
            if let (Some(fragment), Some(then)) = (&rule.when_campaign_contains, &rule.then) {
                if campaign_upper.contains(fragment.as_str()) {
                    return Channel::from_name(then);
                }
            }
            return Channel::from_name(&rule.channel);
        }
    }
    Channel::Other(code.to_string())
}

pub fn classify_market(config: &RuleConfig, client_code: &str) -> Market {
    if config.uk_clients.iter().any(|c| c == client_code) {
        Market::Uk
    } else if config.ire_clients.iter().any(|c| c == client_code) {
        Market::Ire
    } else {
        Market::Unknown
    }
}

// ---------------------------------------------------------------------------
// Division override (second pass)
// ---------------------------------------------------------------------------

/// Channel-conditioned override on top of the base classification:
/// retainer-fee rows are re-divisioned from their cleaned campaign text,
/// and anything tagged Paid Search lands in F&B.
pub fn apply_division_override(
    config: &RuleConfig,
    division: Division,
    channel: &Channel,
    campaign_display: &str,
) -> Division {
    if *channel == Channel::RetainerFee {
        let text = campaign_display.to_uppercase();
        for rule in &config.retainer_overrides {
            if text.contains(rule.contains.as_str()) {
                return rule.division;
            }
        }
    }
    if division == Division::PaidSearch {
        return Division::FAndB;
    }
    division
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RuleConfig {
        RuleConfig::default()
    }

    #[test]
    fn division_rule_order_decides_overlaps() {
        let rules = config().division_rules;
        // Contains both a FSH&EW and a PPC trigger; Fashion is checked first.
        assert_eq!(
            classify_division(&rules, "Fashion Week PPC Blitz"),
            Division::FashionEyewear
        );
        // Travel Retail outranks the F&B product words.
        assert_eq!(
            classify_division(&rules, "Travel Retail Bleu Push"),
            Division::TravelRetail
        );
    }

    #[test]
    fn division_falls_back_to_other() {
        assert_eq!(classify_division(&config().division_rules, "Menswear"), Division::Other);
    }

    #[test]
    fn division_rules_are_case_sensitive() {
        assert_eq!(classify_division(&config().division_rules, "SKINCARE"), Division::Other);
        assert_eq!(classify_division(&config().division_rules, "Skincare"), Division::FAndB);
    }

    #[test]
    fn source_tag_wins_over_rules() {
        let cfg = config();
        assert_eq!(
            division_for_record(&cfg, "Bleu", "whatever", Some("W&FJ")),
            Division::WatchesFineJewellery
        );
        assert_eq!(
            division_for_record(&cfg, "Bleu", "whatever", None),
            Division::FAndB
        );
        // Unrecognized tags fall through to the rule tables.
        assert_eq!(
            division_for_record(&cfg, "Watches", "x", Some("???")),
            Division::WatchesFineJewellery
        );
    }

    #[test]
    fn product_rules_mix_exact_and_contains() {
        let rules = config().product_rules;
        assert_eq!(classify_product(&rules, "EYEWEAR"), "Eyewear");
        assert_eq!(classify_product(&rules, "FASHION MDA SS25"), "Fashion");
        assert_eq!(classify_product(&rules, "JEWELLERY HJ"), "High Jewellery");
        assert_eq!(classify_product(&rules, "LES BEIGES SUMMER"), "Make Up");
        assert_eq!(classify_product(&rules, "UK"), "PPC");
        assert_eq!(classify_product(&rules, "GARDEN TOOLS"), "Other");
    }

    #[test]
    fn channel_display_splits_on_video() {
        let cfg = config();
        assert_eq!(
            classify_channel(&cfg, "DISPLAY", "CHANEL_UK_BLEU_VIDEO_2024", "C50"),
            Channel::Video
        );
        assert_eq!(
            classify_channel(&cfg, "DISPLAY", "CHANEL_UK_BLEU_2024", "C50"),
            Channel::Display
        );
    }

    #[test]
    fn channel_paid_search_clients_take_precedence() {
        let cfg = config();
        assert_eq!(classify_channel(&cfg, "SEARCH&SOC", "x", "C60"), Channel::Search);
        assert_eq!(classify_channel(&cfg, "SEARCH&SOC", "x", "C50"), Channel::Social);
    }

    #[test]
    fn channel_unmapped_code_passes_through() {
        let ch = classify_channel(&config(), "REGIONAL PRESS", "x", "C50");
        assert_eq!(ch, Channel::Other("REGIONAL PRESS".into()));
    }

    #[test]
    fn market_from_client_code() {
        let cfg = config();
        assert_eq!(classify_market(&cfg, "C52"), Market::Uk);
        assert_eq!(classify_market(&cfg, "C58"), Market::Ire);
        assert_eq!(classify_market(&cfg, "C99"), Market::Unknown);
    }

    #[test]
    fn retainer_fee_override_redivisions() {
        let cfg = config();
        assert_eq!(
            apply_division_override(&cfg, Division::Other, &Channel::RetainerFee, "JEWELLERY FEES"),
            Division::WatchesFineJewellery
        );
        assert_eq!(
            apply_division_override(&cfg, Division::FAndB, &Channel::RetainerFee, "FASHION"),
            Division::FashionEyewear
        );
        // No override text: base division stays.
        assert_eq!(
            apply_division_override(&cfg, Division::Ppc, &Channel::RetainerFee, "MISC"),
            Division::Ppc
        );
    }

    #[test]
    fn override_only_applies_to_retainer_rows() {
        let cfg = config();
        assert_eq!(
            apply_division_override(&cfg, Division::FAndB, &Channel::Social, "JEWELLERY"),
            Division::FAndB
        );
    }

    #[test]
    fn paid_search_division_forced_to_fnb() {
        let cfg = config();
        assert_eq!(
            apply_division_override(&cfg, Division::PaidSearch, &Channel::Search, "PPC"),
            Division::FAndB
        );
        assert_eq!(
            apply_division_override(&cfg, Division::PaidSearch, &Channel::Social, "X"),
            Division::FAndB
        );
    }
}
