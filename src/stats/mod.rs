// src/stats/mod.rs
// =============================================================================
// Relative-activity ranking over the finished registry.
//
// For mentions and for activity separately:
//   mean = total / feed count
//   std  = sqrt( sum over feeds of (feed sum - mean)^2 / feed count )
// i.e. the population standard deviation, taken over every feed we know of,
// reachable or not.
//
// A feed's z-score is (feed sum - mean) / std. With no feeds, or when every
// feed has the same sum (std = 0), the score is undefined and reported as
// None instead of dividing by zero.
// =============================================================================

use serde::Serialize;

use crate::registry::{Feed, RegistrySnapshot};

/// Mean and population standard deviation of one per-feed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl Distribution {
    /// `total` must equal the sum of `values`; the registry keeps it that way.
    pub fn new(total: u64, values: &[u64]) -> Self {
        if values.is_empty() {
            return Self { mean: None, std: None };
        }

        let count = values.len() as f64;
        let mean = total as f64 / count;
        let variance = values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / count;

        Self {
            mean: Some(mean),
            std: Some(variance.sqrt()),
        }
    }

    pub fn z_score(&self, value: u64) -> Option<f64> {
        let (mean, std) = (self.mean?, self.std?);
        if std == 0.0 {
            return None;
        }
        Some((value as f64 - mean) / std)
    }

    pub fn delta(&self, value: u64) -> Option<f64> {
        self.mean.map(|mean| value as f64 - mean)
    }
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeed {
    pub url: String,
    /// Mention z-score, the ranking key
    pub z_score: Option<f64>,
    pub mention_delta: Option<f64>,
    pub activity_z_score: Option<f64>,
    /// Mention z-score times activity z-score
    pub combined_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub mentions: Distribution,
    pub activity: Distribution,
    pub feeds: Vec<RankedFeed>,
}

/// Ranks the accessible feeds of `snapshot`, best first. Statistics use
/// every feed. Undefined scores sort last; ties break on URL.
pub fn rank(snapshot: &RegistrySnapshot) -> Ranking {
    let mention_sums: Vec<u64> = snapshot.feeds.iter().map(Feed::mention_sum).collect();
    let activity_sums: Vec<u64> = snapshot.feeds.iter().map(Feed::activity_sum).collect();
    let mentions = Distribution::new(snapshot.total_mentions, &mention_sums);
    let activity = Distribution::new(snapshot.total_activity, &activity_sums);

    let mut feeds: Vec<RankedFeed> = snapshot
        .accessible()
        .map(|feed| {
            let z_score = mentions.z_score(feed.mention_sum());
            let activity_z_score = activity.z_score(feed.activity_sum());
            RankedFeed {
                url: feed.url.clone(),
                z_score,
                mention_delta: mentions.delta(feed.mention_sum()),
                activity_z_score,
                combined_score: z_score.zip(activity_z_score).map(|(m, a)| m * a),
            }
        })
        .collect();

    feeds.sort_by(|a, b| {
        let key = |f: &RankedFeed| f.z_score.unwrap_or(f64::NEG_INFINITY);
        key(b).total_cmp(&key(a)).then_with(|| a.url.cmp(&b.url))
    });

    Ranking {
        mentions,
        activity,
        feeds,
    }
}
