// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over captured runner output, through the public API only.

use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use indoc::formatdoc;
use pretty_assertions::assert_eq;
use unitbridge_runner::{
    aggregate::{RunAggregator, synthetic_failure_name},
    coverage::{CoverageMap, CoverageMark, CoverageSource},
    engine::{CompositeEngine, EngineOutcome},
    outcome::{RunOutcome, TestStatus},
    parse::{DOUBLE_RULE, SINGLE_RULE, StreamingParser, parse_output},
    reporter::{JunitReporter, MessageFormat, ReporterBuilder},
};

struct FixedCoverage;

impl CoverageSource for FixedCoverage {
    fn coverage_map(&self) -> CoverageMap {
        let mut map = CoverageMap::new();
        map.insert("polls/models.py".into(), "NCCCU".parse().unwrap());
        map
    }
}

fn django_output() -> String {
    formatdoc! {"
        Creating test database for alias 'default'...
        System check identified no issues (0 silenced).
        test_future_question (polls.tests.QuestionModelTests) ... ok
        test_old_question (polls.tests.QuestionModelTests) ... FAIL
        test_no_questions (polls.tests.QuestionIndexViewTests) ... ERROR
        test_smtp (polls.tests.MailTests) ... skipped 'needs smtp server'
        test_flaky (polls.tests.MailTests) ... expected failure

        {double}
        FAIL: test_old_question (polls.tests.QuestionModelTests)
        {single}
        Traceback (most recent call last):
          File \"/srv/mysite/polls/tests.py\", line 18, in test_old_question
            self.assertIs(old_question.was_published_recently(), False)
        AssertionError: True is not False

        {double}
        ERROR: test_no_questions (polls.tests.QuestionIndexViewTests)
        {single}
        Traceback (most recent call last):
          File \"/srv/mysite/polls/tests.py\", line 40, in test_no_questions
            response = self.client.get(reverse('polls:index'))
        django.urls.exceptions.NoReverseMatch: 'polls' is not a registered namespace

        {single}
        Ran 5 tests in 0.012s

        FAILED (failures=1, errors=1, skipped=1, expected failures=1)
        Destroying test database for alias 'default'...
        ",
        double = DOUBLE_RULE,
        single = SINGLE_RULE,
    }
}

#[test]
fn django_run_with_coverage() {
    let output = django_output();
    let lines = output.lines().collect::<Vec<_>>();

    let parsed = parse_output(&lines);
    let outcome =
        RunAggregator::new("manage.py", Some(&FixedCoverage)).aggregate(parsed, &lines, 1);

    let summary = outcome
        .iter()
        .map(|entry| (entry.name(), entry.status()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            (
                "test_future_question (polls.tests.QuestionModelTests)",
                TestStatus::Pass
            ),
            (
                "test_old_question (polls.tests.QuestionModelTests)",
                TestStatus::Fail
            ),
            (
                "test_no_questions (polls.tests.QuestionIndexViewTests)",
                TestStatus::Fail
            ),
            ("test_smtp (polls.tests.MailTests)", TestStatus::Skip),
            ("test_flaky (polls.tests.MailTests)", TestStatus::Unsound),
        ]
    );

    let failed = outcome
        .get("test_old_question (polls.tests.QuestionModelTests)")
        .unwrap();
    assert!(
        failed
            .diagnostic()
            .ends_with("AssertionError: True is not False"),
        "diagnostic: {}",
        failed.diagnostic()
    );
    assert_eq!(
        outcome
            .get("test_smtp (polls.tests.MailTests)")
            .unwrap()
            .diagnostic(),
        "needs smtp server"
    );

    for entry in outcome.iter() {
        let coverage = entry.coverage().expect("coverage attached to every entry");
        let models = coverage.get(Utf8Path::new("polls/models.py")).unwrap();
        assert_eq!(models.count(CoverageMark::Covered), 3);
        assert_eq!(models.executable_count(), 4);
    }

    let stats = outcome.stats();
    assert_eq!(
        (stats.total, stats.passed, stats.failed, stats.skipped, stats.unsound),
        (5, 1, 2, 1, 1)
    );
    assert!(!stats.is_success());
}

#[test]
fn streaming_matches_whole_output() {
    let output = django_output();

    let mut parser = StreamingParser::new();
    let mut seen = Vec::new();
    for line in output.lines() {
        parser.push_line(line);
        seen.push(parser.outcome().len());
    }

    // Results become visible as soon as their status line arrives.
    assert_eq!(&seen[..8], &[0, 0, 1, 2, 3, 4, 5, 5]);
    assert_eq!(parser.orphaned_blocks(), 0);
    assert_eq!(parser.finish(), parse_output(output.lines()));
}

#[test]
fn import_error_is_reported_as_suite_failure() {
    let output = formatdoc! {"
        Traceback (most recent call last):
          File \"manage.py\", line 22, in <module>
            main()
        ModuleNotFoundError: No module named 'django'
    "};
    let lines = output.lines().collect::<Vec<_>>();

    let outcome = RunAggregator::new("manage.py", Some(&FixedCoverage)).aggregate(
        parse_output(&lines),
        &lines,
        1,
    );

    assert_eq!(outcome.len(), 1);
    let entry = outcome.get(&synthetic_failure_name("manage.py")).unwrap();
    assert_eq!(entry.status(), TestStatus::Fail);
    assert_eq!(entry.diagnostic(), output.trim_end());
    assert!(entry.coverage().is_none());
}

#[test]
fn clean_exit_without_tests_is_empty() {
    let lines = ["", "Ran 0 tests in 0.000s", "", "OK"];
    let outcome =
        RunAggregator::new("manage.py", None).aggregate(parse_output(&lines), &lines, 0);
    assert!(outcome.is_empty());
    assert!(outcome.stats().is_success());
}

#[test]
fn reports_for_merged_engines() {
    let output = django_output();
    let lines = output.lines().collect::<Vec<_>>();
    let outcome =
        RunAggregator::new("manage.py", None).aggregate(parse_output(&lines), &lines, 1);
    let outcomes = vec![EngineOutcome {
        engine: "django".to_owned(),
        outcome,
    }];

    let dir = Utf8TempDir::new().unwrap();
    let junit_path = dir.path().join("reports/junit.xml");
    JunitReporter::default().write(&junit_path, &outcomes).unwrap();
    let xml = std::fs::read_to_string(&junit_path).unwrap();
    assert!(xml.contains(r#"<testsuite name="django""#), "xml: {xml}");
    assert!(xml.contains("NoReverseMatch"), "xml: {xml}");

    let merged: RunOutcome = CompositeEngine::merge(outcomes);
    let mut buf = Vec::new();
    ReporterBuilder::default()
        .set_message_format(MessageFormat::Json)
        .build()
        .write_outcome(&merged, &mut buf)
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(
        json["test_smtp (polls.tests.MailTests)"]["status"],
        serde_json::json!("skip")
    );
    assert_eq!(json.as_object().unwrap().len(), 5);
}
