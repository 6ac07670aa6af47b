//! Single-step vector checks for the SM83 core.
//!
//! A handful of hand-derived cases always run. Point `SM83_TESTS_DIR` at a
//! checkout of the published per-opcode JSON corpus to run all of it.

use emu_core::sm83_vectors::{run_cases, run_dir, VectorCase, VectorReport};

fn cases(json: &str) -> Vec<VectorCase> {
    serde_json::from_str(json).expect("vector json")
}

fn assert_clean(report: &VectorReport) {
    assert_eq!(
        report.failed, 0,
        "failures: {:#?}",
        &report.failures[..report.failures.len().min(5)]
    );
}

#[test]
fn test_call_pushes_return_address() {
    // CALL $1234 from $C000 with SP=$D000
    let report = run_cases(&cases(
        r#"[{
        "name": "cd 0000",
        "initial": {"pc": 49152, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 0, "h": 0, "l": 0, "ime": 0,
                    "ram": [[49152, 205], [49153, 52], [49154, 18]]},
        "final":   {"pc": 4660, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 0, "h": 0, "l": 0, "ime": 0,
                    "ram": [[49152, 205], [49153, 52], [49154, 18], [53247, 192], [53246, 3]]},
        "cycles": [null, null, null, null, null, null]
    }]"#,
    ));
    assert_clean(&report);
}

#[test]
fn test_add_sp_negative_flags() {
    // ADD SP,$FF with SP=$00FF: H and C from the unsigned low byte
    let report = run_cases(&cases(
        r#"[{
        "name": "e8 0000",
        "initial": {"pc": 256, "sp": 255, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[256, 232], [257, 255]]},
        "final":   {"pc": 258, "sp": 254, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 48, "h": 0, "l": 0, "ime": 0, "ram": [[256, 232], [257, 255]]},
        "cycles": [null, null, null, null]
    }]"#,
    ));
    assert_clean(&report);
}

#[test]
fn test_cp_borrow_flags() {
    // CP $01 with A=$00: Z=0 N=1 H=1 C=1
    let report = run_cases(&cases(
        r#"[{
        "name": "fe 0000",
        "initial": {"pc": 256, "sp": 0, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[256, 254], [257, 1]]},
        "final":   {"pc": 258, "sp": 0, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 112, "h": 0, "l": 0, "ime": 0, "ram": [[256, 254], [257, 1]]},
        "cycles": [null, null]
    }]"#,
    ));
    assert_clean(&report);
}

#[test]
fn test_ret_not_taken_costs_two_cycles() {
    let report = run_cases(&cases(
        r#"[{
        "name": "c8 0000",
        "initial": {"pc": 256, "sp": 65534, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[256, 200]]},
        "final":   {"pc": 257, "sp": 65534, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0,
                    "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[256, 200]]},
        "cycles": [null, null]
    }]"#,
    ));
    assert_clean(&report);
}

#[test]
fn test_published_corpus() {
    let Ok(dir) = std::env::var("SM83_TESTS_DIR") else {
        eprintln!("SM83_TESTS_DIR not set, skipping corpus run");
        return;
    };

    let results = run_dir(&dir).expect("corpus directory readable");
    let mut total = VectorReport::default();
    for (file, report) in results {
        if report.failed > 0 {
            eprintln!("{}: {} failed", file.display(), report.failed);
        }
        total.merge(report);
    }
    eprintln!("{} passed, {} failed", total.passed, total.failed);
    assert_clean(&total);
}
