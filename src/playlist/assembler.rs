use std::collections::HashSet;

use anyhow::Result;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::fuzzy::FeatureTarget;

use super::seed::SeedSelector;
use super::types::{
    CatalogMetadata, CatalogSearch, GenerationOutcome, GenreRequest, HistoryRepository,
    SearchOptions, TrackCandidate,
};

/// Knobs for one assembly pass.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Recency window: how many past playlists per genre are consulted when
    /// deduplicating seeds.
    pub recency_limit: usize,
    pub search: SearchOptions,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        AssemblyOptions {
            recency_limit: 5,
            search: SearchOptions::default(),
        }
    }
}

/// Output of one assembly pass: the final candidate list (already resized to
/// the requested count where possible), the combined seed provenance, and
/// the outcome to report.
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    pub candidates: Vec<TrackCandidate>,
    pub provenance: String,
    pub outcome: GenerationOutcome,
}

/// Merges per-genre searches into one playlist-sized candidate list.
pub struct PlaylistAssembler;

impl PlaylistAssembler {
    /// Run the per-genre seed selection and catalog searches sequentially,
    /// then resize the merged list to exactly `total_count` tracks.
    ///
    /// The feature targets are computed by the caller once per request and
    /// are passed unmodified to every genre's search.
    pub fn assemble<H, S, M, R>(
        features: &FeatureTarget,
        requests: &[GenreRequest],
        total_count: usize,
        user: &str,
        history: &H,
        search: &S,
        metadata: &M,
        options: &AssemblyOptions,
        rng: &mut R,
    ) -> Result<AssemblyResult>
    where
        H: HistoryRepository,
        S: CatalogSearch,
        M: CatalogMetadata,
        R: Rng,
    {
        let mut candidates: Vec<TrackCandidate> = Vec::new();
        let mut seeds: Vec<String> = Vec::with_capacity(requests.len());

        for request in requests {
            let genre_count = request.track_count(total_count);
            let seed = SeedSelector::choose_seed(
                user,
                &request.genre,
                history,
                metadata,
                options.recency_limit,
                rng,
            )?;
            debug!(
                "genre '{}': requesting {} tracks with seed '{}'",
                request.genre,
                genre_count,
                seed.provenance()
            );

            let track_ids = search.search(features, &seed, genre_count, &options.search)?;
            debug!("genre '{}': {} tracks returned", request.genre, track_ids.len());

            seeds.push(seed.provenance());
            candidates.extend(track_ids.into_iter().map(|track_id| TrackCandidate {
                track_id,
                genre: request.genre.clone(),
            }));
        }

        let provenance = seeds.join(";");

        // Searches for overlapping genres can return the same track; keep the
        // first occurrence so it stays tagged with the genre that found it.
        let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
        candidates.retain(|candidate| seen.insert(candidate.track_id.clone()));

        if candidates.is_empty() {
            return Ok(AssemblyResult {
                candidates,
                provenance,
                outcome: GenerationOutcome::error(),
            });
        }

        if candidates.len() > total_count {
            // Uniform sample down to the requested count. Genre proportions
            // are not preserved past this point.
            let picked = rand::seq::index::sample(rng, candidates.len(), total_count);
            let mut sampled = Vec::with_capacity(total_count);
            for index in picked.iter() {
                sampled.push(candidates[index].clone());
            }
            candidates = sampled;
        }

        candidates.shuffle(rng);

        let outcome = if candidates.len() < total_count {
            GenerationOutcome::warning(total_count - candidates.len(), candidates.len())
        } else {
            GenerationOutcome::success(candidates.len())
        };

        Ok(AssemblyResult {
            candidates,
            provenance,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::types::{
        GenerationStatus, MockCatalogMetadata, MockCatalogSearch, MockHistoryRepository,
        SeedChoice,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn requests_70_30() -> Vec<GenreRequest> {
        vec![
            GenreRequest {
                genre: "rock".to_string(),
                percentage: 70.0,
            },
            GenreRequest {
                genre: "jazz".to_string(),
                percentage: 30.0,
            },
        ]
    }

    /// History with no recent playlists: every genre falls back to a genre
    /// seed and the catalog metadata adapter stays untouched.
    fn empty_history() -> MockHistoryRepository {
        let mut history = MockHistoryRepository::new();
        history
            .expect_recent_songs_by_genre()
            .returning(|_, _, _| Ok(vec![]));
        history
    }

    fn ids(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn exact_fill_reports_success() {
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        search
            .expect_search()
            .returning(|_, seed, count, _| match seed {
                SeedChoice::Genre(genre) => Ok(ids(genre, count)),
                SeedChoice::Tracks(_) => panic!("expected genre seeds"),
            });

        let mut rng = StdRng::seed_from_u64(1);
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);
        let result = PlaylistAssembler::assemble(
            &features,
            &requests_70_30(),
            10,
            "user",
            &history,
            &search,
            &metadata,
            &AssemblyOptions::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.candidates.len(), 10);
        assert_eq!(result.outcome.status, GenerationStatus::Success);
        assert_eq!(result.outcome.track_count, 10);
        assert_eq!(result.provenance, "rock;jazz");

        let per_genre: HashMap<&str, usize> =
            result
                .candidates
                .iter()
                .fold(HashMap::new(), |mut acc, candidate| {
                    *acc.entry(candidate.genre.as_str()).or_insert(0) += 1;
                    acc
                });
        assert_eq!(per_genre["rock"], 7);
        assert_eq!(per_genre["jazz"], 3);
    }

    #[test]
    fn shortfall_reports_warning_with_missing_count() {
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        search
            .expect_search()
            .returning(|_, seed, count, _| match seed {
                SeedChoice::Genre(genre) if genre == "jazz" => Ok(vec![]),
                SeedChoice::Genre(genre) => Ok(ids(genre, count)),
                SeedChoice::Tracks(_) => panic!("expected genre seeds"),
            });

        let mut rng = StdRng::seed_from_u64(2);
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);
        let result = PlaylistAssembler::assemble(
            &features,
            &requests_70_30(),
            10,
            "user",
            &history,
            &search,
            &metadata,
            &AssemblyOptions::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.candidates.len(), 7);
        assert_eq!(result.outcome.status, GenerationStatus::Warning);
        assert_eq!(result.outcome.track_count, 7);
        assert!(result.outcome.message.contains("missing 3 tracks"));
    }

    #[test]
    fn track_returned_by_two_genres_appears_once() {
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        // Both genres return "shared" among their results.
        search
            .expect_search()
            .returning(|_, seed, count, _| match seed {
                SeedChoice::Genre(genre) => {
                    let mut tracks = vec!["shared".to_string()];
                    tracks.extend(ids(genre, count - 1));
                    Ok(tracks)
                }
                SeedChoice::Tracks(_) => panic!("expected genre seeds"),
            });

        let mut rng = StdRng::seed_from_u64(7);
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);
        let result = PlaylistAssembler::assemble(
            &features,
            &requests_70_30(),
            10,
            "user",
            &history,
            &search,
            &metadata,
            &AssemblyOptions::default(),
            &mut rng,
        )
        .unwrap();

        let unique: HashSet<&str> = result
            .candidates
            .iter()
            .map(|candidate| candidate.track_id.as_str())
            .collect();
        assert_eq!(unique.len(), result.candidates.len());
        assert_eq!(result.candidates.len(), 9);
        assert_eq!(result.outcome.status, GenerationStatus::Warning);

        // The duplicate keeps the tag of the genre that found it first.
        let shared = result
            .candidates
            .iter()
            .find(|candidate| candidate.track_id == "shared")
            .unwrap();
        assert_eq!(shared.genre, "rock");
    }

    #[test]
    fn zero_results_everywhere_is_an_error() {
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        search.expect_search().returning(|_, _, _, _| Ok(vec![]));

        let mut rng = StdRng::seed_from_u64(3);
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);
        let result = PlaylistAssembler::assemble(
            &features,
            &requests_70_30(),
            10,
            "user",
            &history,
            &search,
            &metadata,
            &AssemblyOptions::default(),
            &mut rng,
        )
        .unwrap();

        assert!(result.candidates.is_empty());
        assert_eq!(result.outcome.status, GenerationStatus::Error);
        assert_eq!(result.outcome.track_count, 0);
    }

    #[test]
    fn oversupply_is_trimmed_to_the_requested_count() {
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        // 100% + 50% of 10 yields 15 raw candidates.
        search
            .expect_search()
            .returning(|_, seed, count, _| match seed {
                SeedChoice::Genre(genre) => Ok(ids(genre, count)),
                SeedChoice::Tracks(_) => panic!("expected genre seeds"),
            });
        let requests = vec![
            GenreRequest {
                genre: "rock".to_string(),
                percentage: 100.0,
            },
            GenreRequest {
                genre: "jazz".to_string(),
                percentage: 50.0,
            },
        ];

        let mut rng = StdRng::seed_from_u64(4);
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);
        let result = PlaylistAssembler::assemble(
            &features,
            &requests,
            10,
            "user",
            &history,
            &search,
            &metadata,
            &AssemblyOptions::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.candidates.len(), 10);
        assert_eq!(result.outcome.status, GenerationStatus::Success);
    }

    #[test]
    fn trim_sampling_is_roughly_uniform() {
        // 15 raw candidates trimmed to 10 over many trials: each candidate
        // should be kept close to 10/15 of the time.
        let history = empty_history();
        let metadata = MockCatalogMetadata::new();
        let mut search = MockCatalogSearch::new();
        search
            .expect_search()
            .returning(|_, seed, count, _| match seed {
                SeedChoice::Genre(genre) => Ok(ids(genre, count)),
                SeedChoice::Tracks(_) => panic!("expected genre seeds"),
            });
        let requests = vec![
            GenreRequest {
                genre: "rock".to_string(),
                percentage: 100.0,
            },
            GenreRequest {
                genre: "jazz".to_string(),
                percentage: 50.0,
            },
        ];
        let features = FeatureTarget::clamped(0.5, 0.5, 120.0, -20.0, 0.5);

        let trials = 2000usize;
        let mut kept: HashMap<String, usize> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..trials {
            let result = PlaylistAssembler::assemble(
                &features,
                &requests,
                10,
                "user",
                &history,
                &search,
                &metadata,
                &AssemblyOptions::default(),
                &mut rng,
            )
            .unwrap();
            for candidate in result.candidates {
                *kept.entry(candidate.track_id).or_insert(0) += 1;
            }
        }

        let expected = trials as f64 * 10.0 / 15.0;
        assert_eq!(kept.len(), 15);
        for (track_id, count) in kept {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.1,
                "track {track_id} kept {count} times, expected about {expected:.0}"
            );
        }
    }
}
