//! Loading a song list from a background "fetch"

use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use hookcell::{HookError, Hooks, Scheduler};

#[derive(Clone, Debug, PartialEq)]
enum Songs {
    Loading,
    Loaded(Vec<String>),
    Failed(String),
}

fn fetch_songs(artist: &str) -> Result<Vec<String>, String> {
    thread::sleep(Duration::from_millis(50));
    match artist {
        "" => Err("no artist given".to_string()),
        _ => Ok(vec![
            format!("{artist} - Opening"),
            format!("{artist} - Interlude"),
            format!("{artist} - Finale"),
        ]),
    }
}

fn song_list(cx: &mut Hooks<'_>, artist: &String) -> Result<String, HookError> {
    let (songs, set_songs) = cx.use_state(Songs::Loading)?;

    let artist = artist.clone();
    cx.use_effect_with((), move || {
        thread::spawn(move || {
            // Fetch failures are the effect's to handle; they arrive as state.
            set_songs.set(match fetch_songs(&artist) {
                Ok(songs) => Songs::Loaded(songs),
                Err(err) => Songs::Failed(err),
            });
        });
    })?;

    let song_count = cx.use_memo(songs.clone(), || match &songs {
        Songs::Loaded(list) => list.len(),
        _ => 0,
    })?;

    Ok(match songs {
        Songs::Loading => "loading...".to_string(),
        Songs::Loaded(list) => format!("{song_count} songs: {}", list.join(", ")),
        Songs::Failed(err) => format!("could not load songs: {err}"),
    })
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Song List Example ===\n");

    let (wake_tx, wake_rx) = mpsc::channel();
    let scheduler = Scheduler::builder()
        .flush_trigger(move || {
            wake_tx.send(()).ok();
        })
        .build();

    let handles = [
        scheduler.mount(song_list, "The Hooks".to_string(), |output: String| {
            println!("   [Render] {output}");
        }),
        scheduler.mount(song_list, String::new(), |output: String| {
            println!("   [Render] {output}");
        }),
    ];

    // A host event loop: wait for the queue to become busy, then flush.
    while handles
        .iter()
        .any(|handle| scheduler.render_count(handle).unwrap_or(0) < 2)
    {
        if wake_rx.recv_timeout(Duration::from_secs(1)).is_err() {
            break;
        }
        scheduler.flush();
    }
}
