/*!
 * End-to-end reconciliation tests over real directory trees
 */

use anyhow::Result;
use std::io;
use std::sync::{Arc, Mutex};
use subfixer::model::MovieEntry;
use subfixer::reconcile::{DryRunFs, NamingMode, NoProgress, Reconciler};
use tokio_util::sync::CancellationToken;

use crate::common::{self, FailingSourceFs, NoLinkFs, TestLibrary};

/// Test the typical movie folder: both language tracks end up next to the movie
#[test]
fn test_run_withSubsFolder_shouldLinkEachSubtitleNextToMovie() -> Result<()> {
    common::init_test_logging();
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo (2020)", "Foo (2020).mkv")?;
    library.add_subtitle("Foo (2020)", "Subs", "en.srt")?;
    library.add_subtitle("Foo (2020)", "Subs", "fr.forced.srt")?;

    let result = Reconciler::default().run(
        &[movie.clone()],
        &library.library_roots(),
        &NoProgress,
        &CancellationToken::new(),
    );

    assert_eq!(result.linked + result.copied, 2);
    assert_eq!(result.movies_changed, 1);
    assert_eq!(result.changed_movies, vec![movie]);
    assert!(result.failures.is_empty());
    assert_eq!(
        common::list_file_names(&library.root().join("Foo (2020)"))?,
        vec!["Foo (2020).en.srt", "Foo (2020).fr.forced.srt", "Foo (2020).mkv"]
    );
    assert_eq!(
        std::fs::read_to_string(library.path("Foo (2020)", "Foo (2020).en.srt"))?,
        common::SAMPLE_SUBTITLE
    );

    Ok(())
}

/// Test that a second run changes nothing
#[test]
fn test_run_withSecondPass_shouldBeIdempotent() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo (2020)", "Foo (2020).mkv")?;
    library.add_subtitle("Foo (2020)", "Subs", "en.srt")?;
    library.add_subtitle("Foo (2020)", "Subs", "de.srt")?;
    let movies = vec![movie];
    let roots = library.library_roots();
    let reconciler = Reconciler::default();

    let first = reconciler.run(&movies, &roots, &NoProgress, &CancellationToken::new());
    let second = reconciler.run(&movies, &roots, &NoProgress, &CancellationToken::new());

    assert!(first.has_changes());
    assert!(!second.has_changes());
    assert_eq!(second.linked + second.copied, 0);
    assert_eq!(second.skipped_existing, 2);
    assert!(second.changed_movies.is_empty());

    Ok(())
}

/// Test that pre-existing files keep their content
#[test]
fn test_run_withExistingSibling_shouldNotOverwrite() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    let existing = common::create_test_file(&library.root().join("Foo"), "Foo.en.srt", "hand made")?;

    let result = Reconciler::default().run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.skipped_existing, 1);
    assert!(!result.has_changes());
    assert_eq!(std::fs::read_to_string(existing)?, "hand made");

    Ok(())
}

/// Test that a movie directly in the library root never pulls in other movies' subtitles
#[test]
fn test_run_withMovieInLibraryRoot_shouldSkipIt() -> Result<()> {
    let library = TestLibrary::new()?;
    let loose = library.add_root_movie("Loose.mkv")?;
    // Would be a "subfolder" of the loose movie without exclusion
    common::create_test_subtitle(&library.root().join("Foo"), "Foo.en.srt")?;

    let result = Reconciler::default().run(&[loose], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.movies_skipped, 1);
    assert!(!result.has_changes());
    assert_eq!(common::list_file_names(library.root())?, vec!["Loose.mkv"]);

    Ok(())
}

/// Test that subtitles deeper than one level and beside the movie are left alone
#[test]
fn test_run_withNestedAndTopLevelSubtitles_shouldOnlyUseFirstLevel() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    common::create_test_subtitle(&library.root().join("Foo"), "loose.it.srt")?;
    library.add_subtitle("Foo", "Subs/Deep", "es.srt")?;
    library.add_subtitle("Foo", "Subs", "nl.srt")?;

    let result = Reconciler::default().run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.linked + result.copied, 1);
    assert_eq!(
        common::list_file_names(&library.root().join("Foo"))?,
        vec!["Foo.mkv", "Foo.nl.srt", "loose.it.srt"]
    );

    Ok(())
}

/// Test progress: one report per movie, non-decreasing, ending at exactly 100
#[test]
fn test_run_withSeveralMovies_shouldReportMonotonicProgress() -> Result<()> {
    let library = TestLibrary::new()?;
    let movies = vec![
        library.add_movie("A", "A.mkv")?,
        library.add_root_movie("Loose.mkv")?,
        library.add_movie("B", "B.mkv")?,
    ];
    library.add_subtitle("B", "Subs", "en.srt")?;
    let reports = Mutex::new(Vec::new());
    let sink = |percent: f64| reports.lock().unwrap().push(percent);

    Reconciler::default().run(&movies, &library.library_roots(), &sink, &CancellationToken::new());

    let reports = reports.into_inner().unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", reports);
    assert_eq!(reports.last().copied(), Some(100.0));
    assert!(reports[0] > 0.0);

    Ok(())
}

/// Test that one broken movie does not stop the others
#[test]
fn test_run_withMissingMovieFolder_shouldRecordFailureAndContinue() -> Result<()> {
    let library = TestLibrary::new()?;
    let ghost = MovieEntry::new(library.path("Ghost", "Ghost.mkv"));
    let bare = MovieEntry::new("Bare.mkv");
    let good = library.add_movie("Good", "Good.mkv")?;
    library.add_subtitle("Good", "Subs", "en.srt")?;

    let result = Reconciler::default().run(
        &[ghost, bare, good.clone()],
        &library.library_roots(),
        &NoProgress,
        &CancellationToken::new(),
    );

    assert_eq!(result.movies_considered, 3);
    assert_eq!(result.failures.len(), 2);
    assert_eq!(result.failures[0].source_path, library.root().join("Ghost"));
    assert_eq!(result.failures[1].error.kind_label(), "path");
    assert_eq!(result.changed_movies, vec![good]);

    Ok(())
}

/// Test that invalid and pathless entries are skipped silently
#[test]
fn test_run_withUnusableEntries_shouldSkipThem() -> Result<()> {
    let library = TestLibrary::new()?;
    let mut virtual_movie = library.add_movie("Foo", "Foo.mkv")?;
    virtual_movie.is_valid = false;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    let pathless = MovieEntry::new("");

    let result = Reconciler::default().run(
        &[virtual_movie, pathless],
        &library.library_roots(),
        &NoProgress,
        &CancellationToken::new(),
    );

    assert_eq!(result.movies_skipped, 2);
    assert!(result.failures.is_empty());
    assert!(!library.path("Foo", "Foo.en.srt").exists());

    Ok(())
}

/// Test that a token cancelled up front stops before the first movie
#[test]
fn test_run_withCancelledToken_shouldDoNothing() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = Reconciler::default().run(&[movie], &library.library_roots(), &NoProgress, &cancel);

    assert!(result.cancelled);
    assert_eq!(result.movies_considered, 0);
    assert!(!library.path("Foo", "Foo.en.srt").exists());

    Ok(())
}

/// Test that cancelling mid-run finishes the current movie and stops
#[test]
fn test_run_withCancelAfterFirstMovie_shouldStopBetweenMovies() -> Result<()> {
    let library = TestLibrary::new()?;
    let movies = vec![library.add_movie("A", "A.mkv")?, library.add_movie("B", "B.mkv")?];
    library.add_subtitle("A", "Subs", "en.srt")?;
    library.add_subtitle("B", "Subs", "en.srt")?;
    let cancel = CancellationToken::new();
    let sink_token = cancel.clone();
    let sink = move |_percent: f64| sink_token.cancel();

    let result = Reconciler::default().run(&movies, &library.library_roots(), &sink, &cancel);

    assert!(result.cancelled);
    assert_eq!(result.movies_considered, 1);
    assert!(library.path("A", "A.en.srt").exists());
    assert!(!library.path("B", "B.en.srt").exists());

    Ok(())
}

/// Test the copy fallback through the whole pipeline
#[test]
fn test_run_withLinksUnavailable_shouldCopyInstead() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle_with("Foo", "Subs", "en.srt", "english")?;
    let fs_impl = Arc::new(NoLinkFs::new(io::ErrorKind::Unsupported));
    let reconciler = Reconciler::with_fs(NamingMode::ReplaceBaseName, fs_impl.clone());

    let result = reconciler.run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.copied, 1);
    assert_eq!(result.linked, 0);
    assert!(result.has_changes());
    assert_eq!(std::fs::read_to_string(library.path("Foo", "Foo.en.srt"))?, "english");

    Ok(())
}

/// Test that two candidates mapping to one name both end up next to the movie
#[test]
fn test_run_withCollidingNames_shouldRenameSecond() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle("Foo", "Subs", "a.en.srt")?;
    library.add_subtitle("Foo", "Extra", "b.en.srt")?;

    let result = Reconciler::default().run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.linked + result.copied, 2);
    assert_eq!(result.name_collisions, 1);
    assert_eq!(result.skipped_existing, 0);
    assert!(result.failures.is_empty());
    let names = common::list_file_names(&library.root().join("Foo"))?;
    assert_eq!(names.len(), 3, "{:?}", names);
    assert!(names.contains(&"Foo.en.srt".to_string()));
    assert!(names.contains(&"Foo.a.en.srt".to_string()) || names.contains(&"Foo.b.en.srt".to_string()));

    Ok(())
}

/// Test the numbered release layout: subtitles without a language tag keep distinct names
#[test]
fn test_run_withNumberedSubtitleNames_shouldKeepEveryTrack() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo (2020)", "Foo (2020).mkv")?;
    for name in ["2_English.srt", "3_French.srt", "4_Spanish.srt"] {
        library.add_subtitle_with("Foo (2020)", "Subs", name, name)?;
    }
    let movies = vec![movie];
    let roots = library.library_roots();
    let reconciler = Reconciler::default();

    let first = reconciler.run(&movies, &roots, &NoProgress, &CancellationToken::new());

    assert_eq!(first.linked + first.copied, 3);
    assert_eq!(first.name_collisions, 2);
    assert_eq!(first.skipped_existing, 0);
    let names = common::list_file_names(&library.root().join("Foo (2020)"))?;
    assert_eq!(names.len(), 4, "{:?}", names);
    assert!(names.contains(&"Foo (2020).srt".to_string()));
    // every track is reachable from one of the sibling files
    let mut contents: Vec<String> = names
        .iter()
        .filter(|name| name.ends_with(".srt"))
        .map(|name| std::fs::read_to_string(library.path("Foo (2020)", name)))
        .collect::<std::io::Result<_>>()?;
    contents.sort();
    assert_eq!(contents, vec!["2_English.srt", "3_French.srt", "4_Spanish.srt"]);

    let second = reconciler.run(&movies, &roots, &NoProgress, &CancellationToken::new());

    assert!(!second.has_changes());
    assert_eq!(second.skipped_existing, 3);
    assert_eq!(second.name_collisions, 2);

    Ok(())
}

/// Test that one failing candidate leaves its siblings, other subfolders and later movies alone
#[test]
fn test_run_withOneFailingCandidate_shouldLinkEverythingElse() -> Result<()> {
    let library = TestLibrary::new()?;
    let foo = library.add_movie("Foo", "Foo.mkv")?;
    let bar = library.add_movie("Bar", "Bar.mkv")?;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    let failing = library.add_subtitle("Foo", "Subs", "fr.srt")?;
    library.add_subtitle("Foo", "Subs", "de.srt")?;
    library.add_subtitle("Foo", "Extra", "it.srt")?;
    library.add_subtitle("Bar", "Subs", "nl.srt")?;
    let reconciler = Reconciler::with_fs(NamingMode::ReplaceBaseName, Arc::new(FailingSourceFs::new("fr.srt")));

    let result = reconciler.run(
        &[foo.clone(), bar.clone()],
        &library.library_roots(),
        &NoProgress,
        &CancellationToken::new(),
    );

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].source_path, failing);
    assert_eq!(result.failures[0].error.kind_label(), "link");
    assert_eq!(result.linked + result.copied, 4);
    assert_eq!(result.changed_movies, vec![foo, bar]);
    assert!(!library.path("Foo", "Foo.fr.srt").exists());
    for (folder, file) in [("Foo", "Foo.en.srt"), ("Foo", "Foo.de.srt"), ("Foo", "Foo.it.srt"), ("Bar", "Bar.nl.srt")] {
        assert!(library.path(folder, file).exists(), "missing {}/{}", folder, file);
    }

    Ok(())
}

/// Test that an unreadable subfolder is recorded and the next subfolder is still read
#[cfg(unix)]
#[test]
fn test_run_withUnreadableSubfolder_shouldRecordFailureAndReadTheRest() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    library.add_subtitle("Foo", "Extra", "sv.srt")?;
    let locked = library.root().join("Foo").join("Locked");
    std::fs::create_dir(&locked)?;
    if !common::lock_directory(&locked)? {
        // permission bits do not apply to this user
        return Ok(());
    }

    let result = Reconciler::default().run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());
    common::unlock_directory(&locked)?;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].error.kind_label(), "directory");
    assert_eq!(result.failures[0].source_path, locked);
    assert_eq!(result.linked + result.copied, 2);
    assert!(library.path("Foo", "Foo.en.srt").exists());
    assert!(library.path("Foo", "Foo.sv.srt").exists());

    Ok(())
}

/// Test that a dry run writes nothing but plans every destination
#[test]
fn test_run_withDryRunFs_shouldOnlyPlan() -> Result<()> {
    let library = TestLibrary::new()?;
    let movie = library.add_movie("Foo", "Foo.mkv")?;
    library.add_subtitle("Foo", "Subs", "en.srt")?;
    library.add_subtitle("Foo", "Subs", "sv.srt")?;
    let plan = Arc::new(DryRunFs::new());
    let reconciler = Reconciler::with_fs(NamingMode::ReplaceBaseName, plan.clone());

    let result = reconciler.run(&[movie], &library.library_roots(), &NoProgress, &CancellationToken::new());

    assert_eq!(result.linked, 2);
    assert_eq!(
        plan.planned(),
        vec![library.path("Foo", "Foo.en.srt"), library.path("Foo", "Foo.sv.srt")]
    );
    assert_eq!(common::list_file_names(&library.root().join("Foo"))?, vec!["Foo.mkv"]);

    Ok(())
}
