use anyhow::Result;
use chrono::Local;
use rand::Rng;

use crate::fuzzy::FeatureTarget;

use super::assembler::{AssemblyOptions, PlaylistAssembler};
use super::types::{
    CatalogMetadata, CatalogSearch, GenerationOutcome, GenerationStatus, GenreRequest,
    HistoryRepository, PlaylistPublisher, PublishRequest,
};

/// Per-request settings for the generator.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub playlist_name: String,
    pub description: String,
    pub assembly: AssemblyOptions,
}

/// Top-level orchestration: one feature target, one assembly pass, at most
/// one publish.
pub struct PlaylistGenerator<'a, H, S, M, P> {
    history: &'a H,
    search: &'a S,
    metadata: &'a M,
    publisher: &'a P,
    options: GeneratorOptions,
}

impl<'a, H, S, M, P> PlaylistGenerator<'a, H, S, M, P>
where
    H: HistoryRepository,
    S: CatalogSearch,
    M: CatalogMetadata,
    P: PlaylistPublisher,
{
    pub fn new(
        history: &'a H,
        search: &'a S,
        metadata: &'a M,
        publisher: &'a P,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            history,
            search,
            metadata,
            publisher,
            options,
        }
    }

    /// Generate and, unless nothing was found, publish a playlist.
    ///
    /// `features` is computed once by the caller (fuzzy inference or custom
    /// overrides) and is never adjusted mid-call. A warning outcome still
    /// publishes whatever was found; only an error outcome skips publishing.
    pub fn generate<R: Rng>(
        &self,
        user: &str,
        features: &FeatureTarget,
        requests: &[GenreRequest],
        total_count: usize,
        rng: &mut R,
    ) -> Result<GenerationOutcome> {
        let result = PlaylistAssembler::assemble(
            features,
            requests,
            total_count,
            user,
            self.history,
            self.search,
            self.metadata,
            &self.options.assembly,
            rng,
        )?;

        if result.outcome.status == GenerationStatus::Error {
            return Ok(result.outcome);
        }

        self.publisher.publish(&PublishRequest {
            user: user.to_string(),
            name: self.options.playlist_name.clone(),
            description: self.options.description.clone(),
            candidates: result.candidates,
            seed_provenance: result.provenance,
            genres: requests.iter().map(|r| r.genre.clone()).collect(),
        })?;

        Ok(result.outcome)
    }
}

/// Default playlist name when the caller does not supply one, in the
/// "friday high spirits mix" style.
pub fn default_playlist_name(mood: Option<f64>) -> String {
    let day_of_week = Local::now().format("%A").to_string();
    let descriptor = match mood {
        Some(value) if value < 0.33 => "low lights",
        Some(value) if value < 0.67 => "easy mood",
        Some(_) => "high spirits",
        None => "custom",
    };
    format!("{day_of_week} {descriptor} mix").to_lowercase()
}
