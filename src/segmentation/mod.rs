pub mod features;
pub mod kmeans;
pub mod mapping;
pub mod scaler;

pub use features::{account_features, feature_matrix};
pub use kmeans::{KMeansConfig, KMeansModel};
pub use mapping::{propose_mapping, ArchetypeMapping};
pub use scaler::StandardScaler;

use ndarray::Array2;
use serde::Serialize;

use crate::errors::PipelineError;
use crate::models::{AccountFeatures, ArchetypeAssignment, JoinedFeatureRow};

/// Output of one clustering pass over all accounts.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationResult {
    pub assignments: Vec<ArchetypeAssignment>,
    /// Centroids in standardized feature space, one row per cluster.
    #[serde(serialize_with = "serialize_matrix")]
    pub centroids: Array2<f64>,
    /// Centroids mapped back to raw feature units, for labeling.
    #[serde(serialize_with = "serialize_matrix")]
    pub raw_centroids: Array2<f64>,
    pub cluster_sizes: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
    pub inertia: f64,
    pub mapping_version: Option<String>,
    /// Centroid-based naming suggestion for a human to confirm.
    pub proposed_mapping: Option<ArchetypeMapping>,
}

/// Cluster accounts into behavioral groups.
///
/// Rows are collapsed per account, standardized, and clustered with
/// k-means. Archetype names are attached only when `mapping` is supplied
/// and covers every cluster.
pub fn segment_accounts(
    rows: &[JoinedFeatureRow],
    config: &KMeansConfig,
    mapping: Option<&ArchetypeMapping>,
) -> Result<SegmentationResult, PipelineError> {
    if config.k == 0 {
        return Err(PipelineError::Configuration("cluster count must be at least 1".into()));
    }
    let per_account = account_features(rows);
    if per_account.len() < config.k {
        return Err(PipelineError::InsufficientData {
            accounts: per_account.len(),
            clusters: config.k,
        });
    }
    if let Some(m) = mapping {
        m.validate(config.k)?;
    }

    let raw = feature_matrix(per_account.values());
    let scaler = StandardScaler::fit(&raw).ok_or_else(|| PipelineError::InsufficientData {
        accounts: 0,
        clusters: config.k,
    })?;
    let scaled = scaler.transform(&raw);

    let model = kmeans::fit(&scaled, config)?;
    let raw_centroids = scaler.inverse_transform(&model.centroids);

    let assignments: Vec<ArchetypeAssignment> = per_account
        .into_iter()
        .zip(scaled.outer_iter())
        .zip(&model.labels)
        .map(|(((account_id, features), vector), &cluster)| ArchetypeAssignment {
            account_id,
            cluster,
            archetype: mapping.and_then(|m| m.archetype(cluster)),
            features,
            feature_vector: vector.to_vec(),
        })
        .collect();

    let proposed_mapping = propose_mapping(&raw_centroids);
    if let Some(proposal) = &proposed_mapping {
        tracing::info!(
            proposal = ?proposal.clusters,
            "Proposed archetype mapping from centroids (not applied)"
        );
    }

    metrics::gauge!("accounts_segmented").set(assignments.len() as f64);
    metrics::gauge!("kmeans_iterations").set(model.iterations as f64);

    if !model.converged {
        tracing::warn!(
            iterations = model.iterations,
            "k-means stopped at the iteration cap before converging"
        );
    }
    tracing::info!(
        accounts = assignments.len(),
        clusters = config.k,
        iterations = model.iterations,
        inertia = model.inertia,
        "Accounts segmented"
    );

    Ok(SegmentationResult {
        cluster_sizes: kmeans::cluster_sizes(&model.labels, config.k).to_vec(),
        assignments,
        centroids: model.centroids,
        raw_centroids,
        iterations: model.iterations,
        converged: model.converged,
        inertia: model.inertia,
        mapping_version: mapping.map(|m| m.version.clone()),
        proposed_mapping,
    })
}

impl SegmentationResult {
    /// Raw centroid of one cluster as named features.
    pub fn centroid_features(&self, cluster: usize) -> Option<AccountFeatures> {
        if cluster >= self.raw_centroids.nrows() {
            return None;
        }
        AccountFeatures::from_slice(&self.raw_centroids.row(cluster).to_vec())
    }
}

fn serialize_matrix<S: serde::Serializer>(m: &Array2<f64>, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = s.serialize_seq(Some(m.nrows()))?;
    for row in m.outer_iter() {
        seq.serialize_element(&row.to_vec())?;
    }
    seq.end()
}
