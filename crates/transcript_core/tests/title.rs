use std::collections::HashSet;
use std::convert::Infallible;
use std::path::Path;

use transcript_core::{dedupe_title, original_title, sequential_title};

#[test]
fn sequential_title_joins_prefix_and_number() {
    assert_eq!(sequential_title("Test", 1), "Test_1");
    assert_eq!(sequential_title("Clase", 12), "Clase_12");
}

#[test]
fn original_title_uses_file_stem() {
    let title = original_title("Clase", Path::new("/media/lecture one.mp4"));
    assert_eq!(title, "Clase_lecture one");
}

#[test]
fn free_title_is_returned_unchanged() {
    let title = dedupe_title("Clase_intro", |_| Ok::<_, Infallible>(false)).unwrap();
    assert_eq!(title, "Clase_intro");
}

#[test]
fn collisions_get_next_numeric_suffix() {
    let taken: HashSet<&str> = ["Clase_intro", "Clase_intro_2", "Clase_intro_3"]
        .into_iter()
        .collect();
    let title = dedupe_title("Clase_intro", |t| Ok::<_, Infallible>(taken.contains(t))).unwrap();
    assert_eq!(title, "Clase_intro_4");
}

#[test]
fn lookup_errors_are_propagated() {
    let result = dedupe_title("Clase_intro", |_| Err("ledger unavailable"));
    assert_eq!(result, Err("ledger unavailable"));
}
