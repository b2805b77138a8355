//! Source classification.
//!
//! Maps an article URL to a named extraction profile by matching a fixed,
//! ordered list of host fragments. Classification is a pure function of the
//! URL string: it never looks at fetched content and never fails, falling
//! back to [`SourceProfile::General`] for anything it does not recognize.

use serde::Serialize;

/// Named heuristic rule-set for one publishing platform.
///
/// Derived once per fetch and carried on the
/// [`Article`](crate::Article) so reports can show where a page came from.
/// `Medium` and `Zhihu` are recognized for that fingerprint but share the
/// general extraction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProfile {
    /// WeChat Official Account articles (mp.weixin.qq.com).
    Wechat,
    /// Notion-hosted pages (notion.com / notion.site).
    Notion,
    /// Medium posts.
    Medium,
    /// Zhihu column articles (zhuanlan.zhihu.com).
    Zhihu,
    /// Everything else: generic article/main/body extraction.
    General,
}

/// Ordered host-fragment table. First match wins.
const HOST_RULES: &[(&str, SourceProfile)] = &[
    ("mp.weixin.qq.com", SourceProfile::Wechat),
    ("notion.com", SourceProfile::Notion),
    ("notion.site", SourceProfile::Notion),
    ("medium.com", SourceProfile::Medium),
    ("zhuanlan.zhihu.com", SourceProfile::Zhihu),
];

/// Classify a URL by host fragment.
///
/// Matches against the fixed rule table in order; no match yields
/// [`SourceProfile::General`]. Identical input always yields the identical
/// profile.
pub fn classify(url: &str) -> SourceProfile {
    for (fragment, profile) in HOST_RULES {
        if url.contains(fragment) {
            return *profile;
        }
    }
    SourceProfile::General
}

impl SourceProfile {
    /// Short lowercase name, used in logs and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            SourceProfile::Wechat => "wechat",
            SourceProfile::Notion => "notion",
            SourceProfile::Medium => "medium",
            SourceProfile::Zhihu => "zhihu",
            SourceProfile::General => "general",
        }
    }
}
