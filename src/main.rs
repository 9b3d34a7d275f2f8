use std::num::NonZeroUsize;

use anyhow::Result;
use clap::{Parser, Subcommand};
use chrono::Timelike;

mod client;
mod config;
mod fuzzy;
mod history;
mod models;
mod playlist;
mod publish;


use crate::client::SpotifyClient;
use crate::config::load_config;
use crate::fuzzy::{FeatureTarget, MoodEngine};
use crate::history::JsonHistoryStore;
use crate::playlist::{
    default_playlist_name, AssemblyOptions, GenerationStatus, GeneratorOptions, GenreRequest,
    PlaylistGenerator, SearchOptions,
};
use crate::publish::PlaylistUploader;

#[derive(Parser)]
#[command(name = "moodlist")]
#[command(about = "Mood-driven playlist generator for Spotify")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and publish a playlist from a mood value
    Generate {
        /// Mood from 0.0 (sad) to 1.0 (happy); omit to pass custom targets
        #[arg(short, long)]
        mood: Option<f64>,

        /// Genres with percentage shares, e.g. "rock:70,jazz:30"
        #[arg(short, long)]
        genres: String,

        /// Number of tracks in the final playlist (at least 1)
        #[arg(short = 'n', long, default_value = "10")]
        count: NonZeroUsize,

        /// Use the mood-only model instead of the time-aware one
        #[arg(long)]
        ignore_time: bool,

        /// Playlist name; defaults to a mood-and-weekday name
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        /// Minimum track length in minutes
        #[arg(long)]
        min_length: Option<f64>,

        /// Maximum track length in minutes
        #[arg(long)]
        max_length: Option<f64>,

        #[arg(long, default_value_t = 50)]
        min_popularity: u32,

        /// How many recent playlists per genre to consult for seed dedup
        #[arg(long, default_value_t = 5)]
        recency_limit: usize,

        /// Custom target energy in [0,1]; all five custom targets are
        /// required when --mood is omitted
        #[arg(long)]
        energy: Option<f64>,

        /// Custom target valence in [0,1]
        #[arg(long)]
        valence: Option<f64>,

        /// Custom target tempo in BPM (60-200)
        #[arg(long)]
        tempo: Option<f64>,

        /// Custom target loudness in dB (-60-0)
        #[arg(long)]
        loudness: Option<f64>,

        /// Custom target danceability in [0,1]
        #[arg(long)]
        danceability: Option<f64>,
    },
    /// Record a liked track so future seed selection can use it
    Like {
        track_id: String,
        #[arg(short, long)]
        genre: String,
    },
}

fn parse_genre_requests(input: &str) -> Result<Vec<GenreRequest>> {
    let mut requests = Vec::new();
    for part in input.split(',').filter(|part| !part.trim().is_empty()) {
        let (genre, percentage) = part
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("expected GENRE:PERCENT, got '{part}'"))?;
        let percentage: f64 = percentage
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid percentage in '{part}'"))?;
        if percentage <= 0.0 {
            return Err(anyhow::anyhow!("percentage must be positive in '{part}'"));
        }
        requests.push(GenreRequest {
            genre: genre.trim().to_lowercase(),
            percentage,
        });
    }
    if requests.is_empty() {
        return Err(anyhow::anyhow!("at least one genre is required"));
    }
    Ok(requests)
}

fn local_fractional_hour() -> f64 {
    let now = chrono::Local::now();
    now.hour() as f64 + now.minute() as f64 / 60.0
}

#[allow(clippy::too_many_arguments)]
fn resolve_features(
    mood: Option<f64>,
    ignore_time: bool,
    energy: Option<f64>,
    valence: Option<f64>,
    tempo: Option<f64>,
    loudness: Option<f64>,
    danceability: Option<f64>,
) -> Result<FeatureTarget> {
    if let Some(mood) = mood {
        let time_of_day = if ignore_time {
            None
        } else {
            Some(local_fractional_hour())
        };
        return Ok(MoodEngine::infer(mood, time_of_day));
    }
    match (energy, valence, tempo, loudness, danceability) {
        (Some(energy), Some(valence), Some(tempo), Some(loudness), Some(danceability)) => Ok(
            FeatureTarget::clamped(energy, valence, tempo, loudness, danceability),
        ),
        _ => Err(anyhow::anyhow!(
            "without --mood, all of --energy, --valence, --tempo, --loudness \
             and --danceability must be given"
        )),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config()?;
    let client = SpotifyClient::new(&config);
    let history = JsonHistoryStore::new(&config.history_file);

    match args.command {
        Command::Like { track_id, genre } => {
            let profile = client.me()?;
            history.record_liked(&profile.id, &track_id, &genre.to_lowercase())?;
            println!("✓ Liked track {track_id} under genre '{genre}'");
            Ok(())
        }
        Command::Generate {
            mood,
            genres,
            count,
            ignore_time,
            name,
            description,
            min_length,
            max_length,
            min_popularity,
            recency_limit,
            energy,
            valence,
            tempo,
            loudness,
            danceability,
        } => {
            let count = count.get();
            let requests = parse_genre_requests(&genres)?;

            println!("Checking API connection...");
            let profile = match client.me() {
                Ok(profile) => {
                    println!(
                        "✓ Connected as {}",
                        profile.display_name.as_deref().unwrap_or(&profile.id)
                    );
                    profile
                }
                Err(e) => {
                    eprintln!("✗ API connection failed: {e}");
                    return Err(e);
                }
            };

            let features = resolve_features(
                mood,
                ignore_time,
                energy,
                valence,
                tempo,
                loudness,
                danceability,
            )?;

            println!("\nTarget audio features:");
            println!("  Energy:       {:.3}", features.energy);
            println!("  Valence:      {:.3}", features.valence);
            println!("  Tempo:        {:.1} BPM", features.tempo);
            println!("  Loudness:     {:.1} dB", features.loudness);
            println!("  Danceability: {:.3}", features.danceability);

            let uploader = PlaylistUploader::new(&client, &history);
            let options = GeneratorOptions {
                playlist_name: name.unwrap_or_else(|| default_playlist_name(mood)),
                description,
                assembly: AssemblyOptions {
                    recency_limit,
                    search: SearchOptions {
                        min_popularity,
                        length_min: min_length,
                        length_max: max_length,
                    },
                },
            };
            let playlist_name = options.playlist_name.clone();
            let generator = PlaylistGenerator::new(&history, &client, &client, &uploader, options);

            println!("\nGenerating playlist '{playlist_name}' ({count} tracks)...");
            let mut rng = rand::thread_rng();
            let outcome = generator.generate(&profile.id, &features, &requests, count, &mut rng)?;

            match outcome.status {
                GenerationStatus::Success => {
                    println!("✓ {} ({} tracks)", outcome.message, outcome.track_count);
                    Ok(())
                }
                GenerationStatus::Warning => {
                    println!("⚠ {} ({} tracks)", outcome.message, outcome.track_count);
                    Ok(())
                }
                GenerationStatus::Error => {
                    eprintln!("✗ {}", outcome.message);
                    Err(anyhow::anyhow!("playlist generation failed"))
                }
            }
        }
    }
}
