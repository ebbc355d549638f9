use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use argtree::actions::List;
use argtree::resource::{File, FileResource, OpenMode, Opener, UrlResource};
use argtree::types::Integer;
use argtree::{Command, Opt, ParseError, Positional, Resource, Slot, parse};

#[derive(Debug, Default)]
struct Calls {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Calls {
    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Recorded {
    location: String,
    calls: Arc<Calls>,
}

impl Resource for Recorded {
    fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for Recorded {
    fn drop(&mut self) {
        self.calls.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
struct RecordingOpener {
    calls: Arc<Calls>,
}

impl Opener for RecordingOpener {
    fn open(&self, target: &str) -> io::Result<Box<dyn Resource>> {
        if target == "broken" {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such thing"));
        }
        self.calls.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Recorded {
            location: target.to_string(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

fn tool(opener: &RecordingOpener) -> Command {
    Command::new("tool")
        .option(
            "input",
            Opt::new(File::with_opener(opener.clone())).long("in").action(List),
        )
        .unwrap()
        .positional("count", Positional::new(Integer))
        .unwrap()
}

#[test]
fn failed_parse_releases_earlier_resources() {
    let opener = RecordingOpener::default();
    let cmd = tool(&opener);

    let err = parse(&cmd, ["--in", "a", "--in", "b", "many"]).unwrap_err();
    assert!(matches!(err, ParseError::UserType { ref name, .. } if name == "count"));
    assert_eq!(opener.calls.opened(), 2);
    assert_eq!(opener.calls.closed(), 2);
}

#[test]
fn unexpected_token_after_resources_releases_them() {
    let opener = RecordingOpener::default();
    let cmd = tool(&opener);

    let err = parse(&cmd, ["--in", "a", "1", "2"]).unwrap_err();
    assert_eq!(err, ParseError::UnexpectedArgument { token: "2".into() });
    assert_eq!(opener.calls.closed(), 1);
}

#[test]
fn failed_open_is_a_type_error_and_releases_the_rest() {
    let opener = RecordingOpener::default();
    let cmd = tool(&opener);

    let err = parse(&cmd, ["--in", "a", "--in", "broken", "1"]).unwrap_err();
    match err {
        ParseError::UserType { name, source } => {
            assert_eq!(name, "--in");
            assert_eq!(source.token, "broken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(opener.calls.opened(), 1);
    assert_eq!(opener.calls.closed(), 1);
}

#[test]
fn partially_read_signature_releases_its_first_slot() {
    let opener = RecordingOpener::default();
    let cmd = Command::<()>::new("tool")
        .option(
            "pair",
            Opt::with_slots([
                Slot::new(File::with_opener(opener.clone())),
                Slot::new(Integer),
            ])
            .long("pair"),
        )
        .unwrap();

    let err = parse(&cmd, ["--pair", "a", "x"]).unwrap_err();
    assert!(matches!(err, ParseError::UserType { .. }));
    assert_eq!(opener.calls.opened(), 1);
    assert_eq!(opener.calls.closed(), 1);
}

#[test]
fn successful_parse_hands_resources_to_the_caller() {
    let opener = RecordingOpener::default();
    let cmd = tool(&opener);

    let matches = parse(&cmd, ["--in", "a", "3"]).unwrap().into_matches();
    assert_eq!(opener.calls.closed(), 0);
    let inputs = matches.get_list("input").unwrap();
    let handle = inputs[0].as_resource().unwrap();
    assert_eq!(handle.location(), "a");
    assert!(handle.is_open());

    assert!(handle.close());
    assert_eq!(opener.calls.closed(), 1);
    assert!(!handle.close());
}

#[test]
fn file_positional_reads_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "some notes").unwrap();

    let cmd = Command::<()>::new("cat")
        .positional("file", Positional::new(UrlResource::new(OpenMode::Read)))
        .unwrap();
    let matches = parse(&cmd, [path.to_string_lossy().into_owned()])
        .unwrap()
        .into_matches();

    let mut text = String::new();
    matches
        .get_resource("file")
        .unwrap()
        .with(|f: &mut FileResource| f.read_to_string(&mut text))
        .unwrap()
        .unwrap();
    assert_eq!(text, "some notes");
}
