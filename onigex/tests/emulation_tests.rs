//! Integration tests for match-time behavior
//!
//! Every pattern here goes through `translate` and is matched on the host engine, so
//! these tests check that the emitted pattern and its wrapper together behave like
//! the Oniguruma source.

use onigex::{
    EmulatedPattern, Options, ParseOptions, Pattern, Rules, Target, parse, translate,
    translate_to_details,
};

fn es2018() -> Options {
    Options {
        target: Some(Target::Es2018),
        ..Options::default()
    }
}

fn compile(pattern: &str) -> Box<dyn Pattern> {
    translate(pattern, &es2018()).unwrap()
}

fn matched<'a>(pattern: &str, text: &'a str) -> Option<&'a str> {
    compile(pattern)
        .find_at(text, 0)
        .unwrap()
        .map(|found| found.as_str(text))
}

#[test]
fn test_visible_captures_match_source_groups() {
    let patterns = [
        "(a)(b)",
        "(?>(a))(b)++",
        "(?<x>a)\\g<x>(c)?",
        "(a)(?:b|c)*+(d)",
        "(?<r>a(?<m>-)?\\g<r>?b)",
    ];
    for pattern in patterns {
        let source = parse(pattern, ParseOptions::default()).unwrap();
        let compiled = compile(pattern);
        assert_eq!(
            compiled.captures_len(),
            source.groups.group_count(),
            "capture count for {}",
            pattern
        );
    }
}

#[test]
fn test_hidden_captures_never_reported() {
    let pattern = compile("(?>(a))(b)++");
    let found = pattern.find_at("abb", 0).unwrap().unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found.group_str("abb", 1), Some("a"));
    assert_eq!(found.group_str("abb", 2), Some("b"));
    assert_eq!(found.group(3), None);
}

#[test]
fn test_atomic_group_does_not_backtrack() {
    assert_eq!(matched("(?>ab|a)c", "abc"), Some("abc"));
    assert_eq!(matched("(?>ab|a)c", "ac"), Some("ac"));
    assert_eq!(matched("(?>ab|a)b", "ab"), None);
}

#[test]
fn test_possessive_quantifier_does_not_give_back() {
    assert_eq!(matched("a*+a", "aaa"), None);
    assert_eq!(matched("a*+b", "aab"), Some("aab"));
}

#[test]
fn test_subroutine_reports_last_call() {
    let pattern = compile(r"(?<n>[ab])\g<n>\g<n>");
    let found = pattern.find_at("abb", 0).unwrap().unwrap();
    assert_eq!(found.named_group("n"), Some(2..3));
    assert_eq!(pattern.capture_names(), vec![Some("n".to_string())]);
}

#[test]
fn test_recursion_bounded_by_limit() {
    let options = Options {
        rules: Rules {
            recursion_limit: 3,
            ..Rules::default()
        },
        ..es2018()
    };
    let pattern = translate(r"\A(?<r>a\g<r>?b)\z", &options).unwrap();
    assert!(pattern.test("ab").unwrap());
    assert!(pattern.test("aaabbb").unwrap());
    assert!(!pattern.test("aabbb").unwrap());
    // One level deeper than the limit fails to match instead of erroring
    assert!(pattern.find_at("aaaabbbb", 0).unwrap().is_none());
}

#[test]
fn test_recursion_at_default_limit() {
    let pattern = compile(r"\A(?<r>a(?<m>-)?\g<r>?b)\z");
    let deep = format!("{}{}", "a".repeat(20), "b".repeat(20));
    let deeper = format!("{}{}", "a".repeat(21), "b".repeat(21));
    assert!(pattern.test(&deep).unwrap());
    assert!(!pattern.test(&deeper).unwrap());

    let found = pattern.find_at("aa-bb", 0).unwrap().unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found.named_group_str("aa-bb", "m"), Some("-"));
}

#[test]
fn test_search_start_with_global() {
    let options = Options {
        global: true,
        ..es2018()
    };
    let pattern = translate(r"\Ga", &options).unwrap();
    assert_eq!(pattern.exec("aab").unwrap().map(|m| m.start), Some(0));
    assert_eq!(pattern.last_index(), 1);
    assert_eq!(pattern.exec("aab").unwrap().map(|m| m.start), Some(1));
    assert!(pattern.exec("aab").unwrap().is_none());
    assert_eq!(pattern.last_index(), 0);
}

#[test]
fn test_not_search_start() {
    let pattern = compile(r"(?!\G)a");
    assert_eq!(pattern.find_at("aa", 0).unwrap().map(|m| m.start), Some(1));
}

#[test]
fn test_line_or_search_start() {
    let pattern = compile(r"(?:^|\G)b");
    let starts: Vec<usize> = pattern
        .find_all("bab\nb")
        .unwrap()
        .iter()
        .map(|m| m.start)
        .collect();
    assert_eq!(starts, vec![0, 4]);
}

#[test]
fn test_lazy_compile_on_first_use() {
    let options = Options {
        lazy_compile_length: Some(1),
        ..es2018()
    };
    let details = translate_to_details("abc", &options).unwrap();
    let config = details.options.clone().unwrap();
    assert!(config.lazy_compile);

    let pattern = EmulatedPattern::new(&details.pattern, &details.flags, config).unwrap();
    assert!(!pattern.is_compiled());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert!(pattern.test("xabc").unwrap()));
        }
    });
    assert!(pattern.is_compiled());
}

#[test]
fn test_line_anchors_only_see_newline() {
    assert_eq!(matched("^b", "a\rb"), None);
    assert_eq!(matched("^b", "a\nb"), Some("b"));
    assert_eq!(matched(r"a\Z", "a\n"), Some("a"));
}

#[test]
fn test_dot_excludes_only_newline() {
    assert_eq!(matched("a.b", "a\rb"), Some("a\rb"));
    assert_eq!(matched("a.b", "a\nb"), None);
    assert_eq!(matched("(?m)a.b", "a\nb"), Some("a\nb"));
}

#[test]
fn test_scoped_case_insensitivity() {
    assert_eq!(matched("a(?i)b", "aB"), Some("aB"));
    assert_eq!(matched("a(?i)b", "AB"), None);
}

#[test]
fn test_unicode_word_class() {
    assert_eq!(matched(r"\w+", "héllo"), Some("héllo"));
    let ascii = Options {
        flags: "W".to_string(),
        ..es2018()
    };
    let pattern = translate(r"\w+", &ascii).unwrap();
    let found = pattern.find_at("héllo", 0).unwrap().unwrap();
    assert_eq!(found.as_str("héllo"), "h");
}

#[test]
fn test_keep_moves_match_start() {
    assert_eq!(matched(r"foo\Kbar", "foobar"), Some("bar"));
}

#[test]
fn test_nested_classes_match_at_every_target() {
    let targets = [
        Options::default(),
        es2018(),
        Options {
            target: Some(Target::Es2024),
            ..Options::default()
        },
        Options {
            target: Some(Target::Es2025),
            ..Options::default()
        },
    ];
    for options in &targets {
        let word_or_a = translate(r"[a\W]", options).unwrap();
        assert!(word_or_a.test("!").unwrap());
        assert!(word_or_a.test("a").unwrap());
        assert!(!word_or_a.test("b").unwrap());

        let consonant = translate("[a-z&&[^aeiou]]", options).unwrap();
        assert!(consonant.test("b").unwrap());
        assert!(!consonant.test("e").unwrap());

        let not_b = translate("[a[^b]]", options).unwrap();
        assert!(not_b.test("c").unwrap());
        assert!(!not_b.test("b").unwrap());

        let nested = translate("[x[b-z&&c]]", options).unwrap();
        assert!(nested.test("c").unwrap());
        assert!(!nested.test("d").unwrap());
    }
}

#[test]
fn test_singleline_line_or_search_start() {
    let options = Options {
        rules: Rules {
            singleline: true,
            ..Rules::default()
        },
        ..es2018()
    };
    let pattern = translate(r"(?:^|\G)b", &options).unwrap();
    assert!(pattern.find_at("a\nb", 0).unwrap().is_none());
    assert_eq!(pattern.find_at("b\nb", 0).unwrap().map(|m| m.start), Some(0));

    let plain = translate("^b", &options).unwrap();
    assert!(plain.find_at("a\nb", 0).unwrap().is_none());
}
