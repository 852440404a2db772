//! Kind-specific rows for the plugin blocks the converter understands.

use crate::error::{ConvertError, Result};
use crate::keys::normalize_class_id;
use crate::model::{PluginData, Price};
use crate::source::{attr, child, child_text, node_text, parse_bool, parse_date, parse_document, parse_price};
use crate::sql::{Dialect, Insert};
use anyhow::{anyhow, bail, Context};
use base64::Engine as _;
use chrono::NaiveDate;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

pub const ENHANCED_FEATURE_COUNT: usize = 40;

/// Class identifiers of the understood plugins.
///
/// The defaults are placeholders that only the bundled test fixtures use.
/// Real exports carry the class ids of the installed plugin assemblies, so
/// those must be supplied through `pluginClassIds`; otherwise every block is
/// stored undecoded in `tDVDxPluginData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginClassIds {
    pub enhanced_purchase_info: String,
    pub enhanced_notes: String,
    pub enhanced_titles: String,
    pub digital_download_info: String,
    pub enhanced_features: String,
}

impl Default for PluginClassIds {
    fn default() -> Self {
        Self {
            enhanced_purchase_info: "{2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c11}".into(),
            enhanced_notes: "{2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c12}".into(),
            enhanced_titles: "{2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c13}".into(),
            digital_download_info: "{2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c14}".into(),
            enhanced_features: "{2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c15}".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    EnhancedPurchaseInfo,
    EnhancedNotes,
    EnhancedTitles,
    DigitalDownloadInfo,
    EnhancedFeatures,
    Opaque,
}

impl PluginClassIds {
    pub fn classify(&self, class_id: &str) -> PluginKind {
        let id = normalize_class_id(class_id);
        let known = [
            (&self.enhanced_purchase_info, PluginKind::EnhancedPurchaseInfo),
            (&self.enhanced_notes, PluginKind::EnhancedNotes),
            (&self.enhanced_titles, PluginKind::EnhancedTitles),
            (&self.digital_download_info, PluginKind::DigitalDownloadInfo),
            (&self.enhanced_features, PluginKind::EnhancedFeatures),
        ];
        known
            .into_iter()
            .find(|(candidate, _)| normalize_class_id(candidate) == id)
            .map(|(_, kind)| kind)
            .unwrap_or(PluginKind::Opaque)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseDetails {
    pub original_price: Option<Price>,
    pub shipping_cost: Option<Price>,
    pub credit_card_charge: Option<Price>,
    pub credit_card_fees: Option<Price>,
    pub discount: Option<Price>,
    pub customs_fees: Option<Price>,
    pub coupon_type: Option<String>,
    pub coupon_code: Option<String>,
    pub additional_price_1: Option<Price>,
    pub additional_price_2: Option<Price>,
    pub order_date: Option<NaiveDate>,
    pub shipping_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub additional_date_1: Option<NaiveDate>,
    pub additional_date_2: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub text: String,
    pub is_html: bool,
}

/// A decoded plugin block.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginBlock {
    EnhancedPurchaseInfo(Box<PurchaseDetails>),
    EnhancedNotes([Option<Note>; 5]),
    EnhancedTitles([Option<String>; 5]),
    DigitalDownloadInfo {
        company: Option<String>,
        code: Option<String>,
    },
    EnhancedFeatures([bool; ENHANCED_FEATURE_COUNT]),
    Opaque,
}

impl PluginBlock {
    /// Only a plugin entry holding exactly one block is decoded.
    pub fn decode(kind: PluginKind, plugin: &PluginData) -> Result<Self> {
        let [markup] = plugin.blocks.as_slice() else {
            return Ok(PluginBlock::Opaque);
        };
        if kind == PluginKind::Opaque {
            return Ok(PluginBlock::Opaque);
        }
        decode_block(kind, markup).map_err(|source| ConvertError::PluginBlock {
            class_id: plugin.class_id.clone(),
            source,
        })
    }

    /// The row keyed by the profile id, or nothing for an opaque block.
    pub fn row(&self, profile_id: &str, dialect: Dialect) -> Option<String> {
        let row = match self {
            PluginBlock::EnhancedPurchaseInfo(p) => Insert::new("tEnhancedPurchaseInfo", dialect)
                .text(profile_id)
                .opt_price(p.original_price.as_ref())
                .opt_price(p.shipping_cost.as_ref())
                .opt_price(p.credit_card_charge.as_ref())
                .opt_price(p.credit_card_fees.as_ref())
                .opt_price(p.discount.as_ref())
                .opt_price(p.customs_fees.as_ref())
                .maybe_text(p.coupon_type.as_deref())
                .maybe_text(p.coupon_code.as_deref())
                .opt_price(p.additional_price_1.as_ref())
                .opt_price(p.additional_price_2.as_ref())
                .date(p.order_date)
                .date(p.shipping_date)
                .date(p.delivery_date)
                .date(p.additional_date_1)
                .date(p.additional_date_2),
            PluginBlock::EnhancedNotes(notes) => {
                notes
                    .iter()
                    .fold(Insert::new("tEnhancedNotes", dialect).text(profile_id), |row, note| {
                        match note {
                            Some(note) => row.opt_text(&note.text).boolean(note.is_html),
                            None => row.null().null(),
                        }
                    })
            }
            PluginBlock::EnhancedTitles(titles) => titles.iter().fold(
                Insert::new("tEnhancedTitles", dialect).text(profile_id),
                |row, title| row.maybe_text(title.as_deref()),
            ),
            PluginBlock::DigitalDownloadInfo { company, code } => {
                Insert::new("tDigitalDownloadInfo", dialect)
                    .text(profile_id)
                    .maybe_text(company.as_deref())
                    .maybe_text(code.as_deref())
            }
            PluginBlock::EnhancedFeatures(flags) => flags.iter().fold(
                Insert::new("tEnhancedFeatures", dialect).text(profile_id),
                |row, flag| row.boolean(*flag),
            ),
            PluginBlock::Opaque => return None,
        };
        Some(row.finish())
    }
}

fn decode_block(kind: PluginKind, markup: &str) -> anyhow::Result<PluginBlock> {
    let doc = parse_document(markup)?;
    let root = doc.root_element();
    let block = match kind {
        PluginKind::EnhancedPurchaseInfo => {
            PluginBlock::EnhancedPurchaseInfo(Box::new(decode_purchase(root)?))
        }
        PluginKind::EnhancedNotes => {
            let mut notes: [Option<Note>; 5] = Default::default();
            for (i, slot) in notes.iter_mut().enumerate() {
                let name = format!("Note{}", i + 1);
                *slot = child(root, &name)
                    .map(|n| -> anyhow::Result<Note> {
                        Ok(Note {
                            text: decoded_text(n, "Base64Note")?,
                            is_html: parse_bool(&attr(n, "IsHtml"))
                                .with_context(|| format!("{name}@IsHtml"))?,
                        })
                    })
                    .transpose()?;
            }
            PluginBlock::EnhancedNotes(notes)
        }
        PluginKind::EnhancedTitles => {
            let names = [
                "InternationalEnglishTitle",
                "AlternateOriginalTitle",
                "NonLatinLettersTitle",
                "AdditionalTitle1",
                "AdditionalTitle2",
            ];
            let mut titles: [Option<String>; 5] = Default::default();
            for (slot, name) in titles.iter_mut().zip(names) {
                *slot = child(root, name)
                    .map(|n| decoded_text(n, "Base64Title"))
                    .transpose()?;
            }
            PluginBlock::EnhancedTitles(titles)
        }
        PluginKind::DigitalDownloadInfo => PluginBlock::DigitalDownloadInfo {
            company: child(root, "Company")
                .map(|n| decoded_text(n, "Base64Text"))
                .transpose()?,
            code: child(root, "Code")
                .map(|n| decoded_text(n, "Base64Text"))
                .transpose()?,
        },
        PluginKind::EnhancedFeatures => {
            let mut flags = [false; ENHANCED_FEATURE_COUNT];
            for feature in root
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "Feature")
            {
                let index_text = attr(feature, "Index");
                let index: usize = index_text
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid feature index {index_text:?}"))?;
                if !(1..=ENHANCED_FEATURE_COUNT).contains(&index) {
                    bail!("feature index {index} out of range");
                }
                flags[index - 1] = parse_bool(&node_text(feature))?;
            }
            PluginBlock::EnhancedFeatures(flags)
        }
        PluginKind::Opaque => PluginBlock::Opaque,
    };
    Ok(block)
}

fn decode_purchase(root: Node) -> anyhow::Result<PurchaseDetails> {
    let price = |name: &str| -> anyhow::Result<Option<Price>> {
        child(root, name)
            .map(parse_price)
            .transpose()
            .with_context(|| name.to_string())
    };
    let date = |name: &str| -> anyhow::Result<Option<NaiveDate>> {
        match child(root, name) {
            Some(n) if !node_text(n).trim().is_empty() => {
                parse_date(&node_text(n)).map(Some).with_context(|| name.to_string())
            }
            _ => Ok(None),
        }
    };
    let text = |name: &str| child(root, name).map(|_| child_text(root, name));

    Ok(PurchaseDetails {
        original_price: price("OriginalPrice")?,
        shipping_cost: price("ShippingCost")?,
        credit_card_charge: price("CreditCardCharge")?,
        credit_card_fees: price("CreditCardFees")?,
        discount: price("Discount")?,
        customs_fees: price("CustomsFees")?,
        coupon_type: text("CouponType"),
        coupon_code: text("CouponCode"),
        additional_price_1: price("AdditionalPrice1")?,
        additional_price_2: price("AdditionalPrice2")?,
        order_date: date("OrderDate")?,
        shipping_date: date("ShippingDate")?,
        delivery_date: date("DeliveryDate")?,
        additional_date_1: date("AdditionalDate1")?,
        additional_date_2: date("AdditionalDate2")?,
    })
}

/// Element text, unless the base64 attribute carries a non-empty override.
fn decoded_text(node: Node, base64_attr: &str) -> anyhow::Result<String> {
    match node.attribute(base64_attr) {
        Some(encoded) if !encoded.is_empty() => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .with_context(|| format!("invalid {base64_attr}"))?;
            String::from_utf8(bytes).map_err(|_| anyhow!("{base64_attr} is not UTF-8"))
        }
        _ => Ok(node_text(node)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(class_id: &str, blocks: &[&str]) -> PluginData {
        PluginData {
            class_id: class_id.into(),
            name: "Test".into(),
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn classification_ignores_braces_and_case() {
        let ids = PluginClassIds::default();
        let upper = ids.enhanced_notes.to_uppercase();
        assert_eq!(ids.classify(&upper), PluginKind::EnhancedNotes);
        assert_eq!(
            ids.classify(ids.enhanced_features.trim_matches(|c| c == '{' || c == '}')),
            PluginKind::EnhancedFeatures
        );
        assert_eq!(ids.classify("{00000000-0000-0000-0000-000000000000}"), PluginKind::Opaque);
    }

    #[test]
    fn notes_prefer_base64_payload() {
        let markup = r#"<EnhancedNotes><Note1 IsHtml="false">plain</Note1><Note3 IsHtml="true" Base64Note="PGI+Ym9sZDwvYj4=">ignored</Note3></EnhancedNotes>"#;
        let block = PluginBlock::decode(PluginKind::EnhancedNotes, &plugin("x", &[markup])).unwrap();
        let row = block.row("42", Dialect::Sqlite).unwrap();
        assert_eq!(
            row,
            "INSERT INTO tEnhancedNotes VALUES ('42', 'plain', False, NULL, NULL, '<b>bold</b>', True, NULL, NULL, NULL, NULL)"
        );
    }

    #[test]
    fn features_are_placed_by_one_based_index() {
        let markup = r#"<EnhancedFeatures><Feature Index="1">true</Feature><Feature Index="40">true</Feature></EnhancedFeatures>"#;
        let block =
            PluginBlock::decode(PluginKind::EnhancedFeatures, &plugin("x", &[markup])).unwrap();
        let PluginBlock::EnhancedFeatures(flags) = &block else {
            panic!("expected features");
        };
        assert!(flags[0]);
        assert!(flags[39]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 2);
        let row = block.row("1", Dialect::Sqlite).unwrap();
        assert_eq!(row.matches(", ").count(), ENHANCED_FEATURE_COUNT);
    }

    #[test]
    fn out_of_range_feature_index_fails() {
        let markup = r#"<EnhancedFeatures><Feature Index="41">true</Feature></EnhancedFeatures>"#;
        let err = PluginBlock::decode(PluginKind::EnhancedFeatures, &plugin("x", &[markup]))
            .unwrap_err();
        assert_eq!(err.code(), "source_invalid");
    }

    #[test]
    fn purchase_info_keeps_present_zero_prices() {
        let markup = r#"<EnhancedPurchaseInfo><OriginalPrice DenominationType="EUR">0</OriginalPrice><CouponCode>SAVE</CouponCode><OrderDate>2021-02-03</OrderDate></EnhancedPurchaseInfo>"#;
        let block =
            PluginBlock::decode(PluginKind::EnhancedPurchaseInfo, &plugin("x", &[markup])).unwrap();
        let row = block.row("7", Dialect::Jet).unwrap();
        assert!(row.starts_with("INSERT INTO tEnhancedPurchaseInfo VALUES ('7', 'EUR', 0, NULL, NULL,"));
        assert!(row.contains("NULL, 'SAVE'"));
        assert!(row.contains("#2/3/2021#"));
    }

    #[test]
    fn titles_and_download_info_decode_base64() {
        let titles = r#"<EnhancedTitles><InternationalEnglishTitle Base64Title="U3Bpcml0ZWQgQXdheQ==">x</InternationalEnglishTitle><AdditionalTitle2>Extra</AdditionalTitle2></EnhancedTitles>"#;
        let block = PluginBlock::decode(PluginKind::EnhancedTitles, &plugin("x", &[titles])).unwrap();
        assert_eq!(
            block.row("9", Dialect::Sqlite).unwrap(),
            "INSERT INTO tEnhancedTitles VALUES ('9', 'Spirited Away', NULL, NULL, NULL, 'Extra')"
        );

        let ddi = r#"<DigitalDownloadInfo><Company>Store</Company></DigitalDownloadInfo>"#;
        let block =
            PluginBlock::decode(PluginKind::DigitalDownloadInfo, &plugin("x", &[ddi])).unwrap();
        assert_eq!(
            block.row("9", Dialect::Sqlite).unwrap(),
            "INSERT INTO tDigitalDownloadInfo VALUES ('9', 'Store', NULL)"
        );
    }

    #[test]
    fn multiple_or_missing_blocks_are_not_decoded() {
        let a = "<EnhancedNotes/>";
        let two = plugin("x", &[a, a]);
        assert_eq!(
            PluginBlock::decode(PluginKind::EnhancedNotes, &two).unwrap(),
            PluginBlock::Opaque
        );
        let none = plugin("x", &[]);
        assert_eq!(
            PluginBlock::decode(PluginKind::EnhancedNotes, &none).unwrap(),
            PluginBlock::Opaque
        );
        assert!(PluginBlock::Opaque.row("1", Dialect::Sqlite).is_none());
    }
}
