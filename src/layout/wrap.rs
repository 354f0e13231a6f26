/// Greedy word wrapper.
///
/// Words are separated by any whitespace except `\n`. A newline inside a word
/// is a forced break: the fragment before it closes the current line (or gets
/// a line of its own when it would not fit), fragments between consecutive
/// newlines become their own, possibly empty, lines, and accumulation resumes
/// with the fragment after the last newline.
///
/// `measure` returns the pixel width of a candidate line. A line only breaks
/// when the candidate is strictly wider than `max_width`, so a word of exactly
/// that width stays put. Words are never split; an over-long word overflows
/// its own line. A `max_width` of zero or less disables wrapping and the text
/// comes back split on its literal newlines only.
pub fn wrap_lines<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let text = text.trim_matches('\n');
    if max_width <= 0.0 {
        return text.split('\n').map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(is_word_separator).filter(|word| !word.is_empty()) {
        let mut segments = word.split('\n');
        let head = segments.next().unwrap_or_default();

        let candidate = join_words(&current, head);
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, head.to_string()));
        } else {
            current = candidate;
        }

        let rest: Vec<&str> = segments.collect();
        let Some((last, middle)) = rest.split_last() else {
            continue;
        };
        lines.push(std::mem::take(&mut current));
        lines.extend(middle.iter().map(|segment| segment.to_string()));
        current = last.to_string();
    }

    lines.push(current);
    lines
}

fn is_word_separator(ch: char) -> bool {
    ch.is_whitespace() && ch != '\n'
}

fn join_words(current: &str, word: &str) -> String {
    if current.is_empty() {
        word.to_string()
    } else if word.is_empty() {
        current.to_string()
    } else {
        format!("{} {}", current, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_per_char(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = wrap_lines("Flurry of Blows", 500.0, ten_per_char);
        assert_eq!(lines, vec!["Flurry of Blows"]);
    }

    #[test]
    fn breaks_before_the_word_that_overflows() {
        let lines = wrap_lines("one two three four", 90.0, ten_per_char);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn word_exactly_at_the_limit_fits() {
        let lines = wrap_lines("abcde fghij", 50.0, ten_per_char);
        assert_eq!(lines, vec!["abcde", "fghij"]);

        let lines = wrap_lines("ab cd", 50.0, ten_per_char);
        assert_eq!(lines, vec!["ab cd"]);
    }

    #[test]
    fn long_word_overflows_its_own_line_without_an_empty_line() {
        let lines = wrap_lines("extraordinary a", 50.0, ten_per_char);
        assert_eq!(lines, vec!["extraordinary", "a"]);
    }

    #[test]
    fn keeps_every_word_in_order() {
        let text = "Your speed increases by 10 feet while you are not wearing armor or wielding a shield";
        for width in [130.0, 170.0, 250.0, 400.0, 1000.0] {
            let lines = wrap_lines(text, width, ten_per_char);
            assert!(lines.iter().all(|line| ten_per_char(line) <= width));
            let rejoined: Vec<&str> = lines.iter().flat_map(|line| line.split(' ')).collect();
            let original: Vec<&str> = text.split(' ').collect();
            assert_eq!(rejoined, original, "width {}", width);
        }
    }

    #[test]
    fn forced_break_always_ends_the_line() {
        let lines = wrap_lines("a b\nc d", 1000.0, ten_per_char);
        assert_eq!(lines, vec!["a b", "c d"]);
    }

    #[test]
    fn fragment_before_break_moves_down_when_it_does_not_fit() {
        let lines = wrap_lines("aaaa bbbb\ncc", 60.0, ten_per_char);
        assert_eq!(lines, vec!["aaaa", "bbbb", "cc"]);
    }

    #[test]
    fn consecutive_breaks_produce_empty_lines() {
        let lines = wrap_lines("Ki Points\n\nYou have 2 points", 1000.0, ten_per_char);
        assert_eq!(lines, vec!["Ki Points", "", "You have 2 points"]);

        let lines = wrap_lines("one \n\n two", 1000.0, ten_per_char);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn outer_newlines_are_stripped() {
        let lines = wrap_lines("\n\nStunning Strike\n", 1000.0, ten_per_char);
        assert_eq!(lines, vec!["Stunning Strike"]);
    }

    #[test]
    fn non_positive_width_disables_wrapping() {
        let text = "\nline one is long\nline two\n";
        let lines = wrap_lines(text, 0.0, ten_per_char);
        assert_eq!(lines.join("\n"), "line one is long\nline two");

        let lines = wrap_lines("a b c", -5.0, ten_per_char);
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_lines("", 100.0, ten_per_char), vec![""]);
    }
}
