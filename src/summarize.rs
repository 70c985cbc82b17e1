//! Extractive key points and lexicon sentiment for article text.
//!
//! Everything here is a pure function of its input: no I/O, no shared state.

use crate::models::{Sentiment, Summary};

/// Maximum number of sentences returned as key points.
pub const KEY_POINTS: usize = 5;

pub fn summarize(text: &str) -> Summary {
    let score = sentiment_score(text);
    Summary {
        summary: key_points(text, KEY_POINTS),
        sentiment: classify(score),
        score,
    }
}

/// First `limit` sentences of `text`, in order.
pub fn key_points(text: &str, limit: usize) -> Vec<String> {
    let mut sentences = split_sentences(text);
    sentences.truncate(limit);
    sentences
}

pub fn classify(score: i32) -> Sentiment {
    match score {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Split on terminal punctuation followed by whitespace and something that
/// looks like a sentence start. Common abbreviations and initials don't end
/// a sentence. Best effort, locale-agnostic.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminal(c) {
            i += 1;
            continue;
        }

        // Swallow runs like "?!" or ".\"" into this sentence.
        let mut j = i + 1;
        while j < chars.len() && (is_terminal(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let end = chars.get(j).map_or(text.len(), |(p, _)| *p);

        let boundary = match chars.get(j) {
            None => true,
            Some((_, next)) if !next.is_whitespace() => false,
            Some(_) => match chars[j..].iter().find(|(_, ch)| !ch.is_whitespace()) {
                None => true,
                Some((_, next)) => {
                    let opens = next.is_uppercase() || next.is_numeric() || is_opening(*next);
                    opens && !(c == '.' && ends_with_abbreviation(&text[start..pos]))
                }
            },
        };

        if boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
        i = j;
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(segment.to_string());
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

fn is_opening(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘' | '«')
}

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "inc", "ltd", "co", "corp",
    "gen", "gov", "sen", "rep", "lt", "col", "capt", "fig", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

fn ends_with_abbreviation(before_dot: &str) -> bool {
    let mut words = before_dot.split_whitespace().rev();
    let Some(word) = words.next() else {
        return false;
    };
    let word = word.trim_start_matches(is_opening);

    // Dotted letters ("U.S.", "e.g."), not decimals or domains
    if word.contains('.') {
        return word
            .split('.')
            .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic));
    }

    // A lone capital is an initial when it opens the sentence or follows a
    // title or another initial ("J. Doe", "Mr. J. Doe", "J. R. Tolkien").
    // "Plan B." still ends a sentence.
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_uppercase() {
            return words.next().map_or(true, |prev| prev.ends_with('.'));
        }
    }

    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Sum of per-token polarity weights. A negator flips the next token.
pub fn sentiment_score(text: &str) -> i32 {
    let lowered = text.to_lowercase().replace('’', "'");
    let tokens: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|t| t.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
        .collect();

    tokens
        .iter()
        .enumerate()
        .map(|(idx, token)| {
            let weight = polarity(token);
            if weight != 0 && idx > 0 && is_negator(tokens[idx - 1]) {
                -weight
            } else {
                weight
            }
        })
        .sum()
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "nor" | "neither" | "hardly" | "without" | "cannot"
            | "don't" | "dont" | "doesn't" | "doesnt" | "didn't" | "didnt" | "isn't" | "isnt"
            | "wasn't" | "wasnt" | "aren't" | "arent" | "weren't" | "werent" | "won't" | "wont"
            | "can't" | "cant" | "couldn't" | "couldnt" | "shouldn't" | "shouldnt"
            | "wouldn't" | "wouldnt"
    )
}

/// Static affect lexicon, weights in [-5, 5].
fn polarity(token: &str) -> i32 {
    match token {
        "superb" | "outstanding" | "thrilled" => 5,
        "wonderful" | "amazing" | "awesome" | "fantastic" | "brilliant" | "win" | "wins"
        | "winning" | "fun" => 4,
        "good" | "great" | "excellent" | "best" | "happy" | "glad" | "joy" | "love" | "loved"
        | "loves" | "nice" | "successful" | "won" | "victory" | "celebrate" | "celebrated"
        | "praise" | "praised" | "breakthrough" | "excited" | "exciting" | "beautiful"
        | "perfect" | "impressive" | "lucky" | "grateful" | "pleased" => 3,
        "better" | "like" | "likes" | "liked" | "positive" | "success" | "gain" | "gains"
        | "growth" | "improve" | "improved" | "improves" | "improvement" | "benefit"
        | "benefits" | "hope" | "hopeful" | "optimistic" | "strong" | "stronger" | "support"
        | "supported" | "secure" | "innovative" | "rescue" | "rescued" | "remarkable"
        | "favorable" | "fortunate" | "peace" | "peaceful" | "approve" | "approved"
        | "welcome" | "thank" | "thanks" | "proud" | "help" | "helpful" | "healthy" | "enjoy"
        | "enjoyed" | "profit" | "profits" => 2,
        "safe" | "boost" | "boosted" | "innovation" | "agree" | "agreement" | "recover"
        | "recovered" => 1,

        "attack" | "attacks" | "decline" | "declined" | "drop" | "dropped" | "poverty"
        | "disease" => -1,
        "poor" | "sad" | "fear" | "fears" | "afraid" | "disaster" | "death" | "war" | "crash"
        | "crashed" | "fail" | "fails" | "failed" | "failure" | "collapse" | "collapsed"
        | "threat" | "threats" | "threaten" | "threatened" | "danger" | "dangerous" | "risk"
        | "risks" | "problem" | "problems" | "injured" | "injury" | "hurt" | "pain"
        | "painful" | "corruption" | "blame" | "blamed" | "protest" | "protests" | "conflict"
        | "weak" | "weaker" | "concerned" | "unfortunately" | "tragic" | "tragedy"
        | "shocking" | "shock" | "upset" | "disappointed" | "disappointing" | "wrong"
        | "error" | "recession" | "unemployment" | "sick" | "outbreak" | "flood" | "lawsuit"
        | "sued" | "arrest" | "dispute" | "chaos" => -2,
        "bad" | "terrible" | "awful" | "horrible" | "worst" | "worse" | "angry" | "anger"
        | "hate" | "hated" | "crisis" | "disastrous" | "catastrophe" | "kill" | "killed"
        | "killing" | "dead" | "die" | "died" | "violence" | "violent" | "loss" | "losses"
        | "lose" | "lost" | "losing" | "damage" | "damaged" | "scandal" | "corrupt" | "guilty"
        | "worry" | "worried" | "ugly" | "destroy" | "destroyed" | "arrested" | "panic"
        | "evil" | "cruel" | "abuse" => -3,
        "catastrophic" | "fraud" => -4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sentences_come_back_in_order() {
        let text = "Markets opened higher today. Analysts expect the rally to continue.";
        assert_eq!(
            key_points(text, KEY_POINTS),
            vec!["Markets opened higher today.", "Analysts expect the rally to continue."]
        );
    }

    #[test]
    fn ten_sentences_are_cut_to_five() {
        let text: String = (1..=10).map(|i| format!("Sentence number {i} is here. ")).collect();
        let points = key_points(&text, KEY_POINTS);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], "Sentence number 1 is here.");
        assert_eq!(points[4], "Sentence number 5 is here.");
    }

    #[test]
    fn abbreviations_and_decimals_do_not_split() {
        let text = "Dr. Smith met Mr. J. Doe in the U.S. Capitol. Rates rose 3.5 percent!";
        assert_eq!(
            split_sentences(text),
            vec!["Dr. Smith met Mr. J. Doe in the U.S. Capitol.", "Rates rose 3.5 percent!"]
        );
    }

    #[test]
    fn numbers_domains_and_single_letters_still_end_sentences() {
        for (first, second) in [
            ("Inflation rose to 3.5.", "Analysts were surprised."),
            ("The answer was no.", "Officials declined to comment."),
            ("Read more at example.com.", "The site is free."),
            ("He backed Plan B.", "Critics disagreed."),
        ] {
            let text = format!("{first} {second}");
            assert_eq!(split_sentences(&text), vec![first, second], "splitting {text:?}");
        }
    }

    #[test]
    fn dotted_letters_and_leading_initials_do_not_split() {
        assert_eq!(
            split_sentences("Officials cited e.g. trade data. J. R. Tolkien wrote it."),
            vec!["Officials cited e.g. trade data.", "J. R. Tolkien wrote it."]
        );
    }

    #[test]
    fn punctuation_runs_and_quotes_stay_attached() {
        let text = "He asked \"why?\" Nobody knew?! Then it ended";
        assert_eq!(
            split_sentences(text),
            vec!["He asked \"why?\"", "Nobody knew?!", "Then it ended"]
        );
    }

    #[test]
    fn lowercase_continuation_is_not_a_boundary() {
        assert_eq!(split_sentences("Prices fell. then recovered."), vec!["Prices fell. then recovered."]);
    }

    #[test]
    fn empty_text_is_neutral_with_no_points() {
        let summary = summarize("");
        assert!(summary.summary.is_empty());
        assert_eq!(summary.sentiment, Sentiment::Neutral);
        assert_eq!(summary.score, 0);
        assert!(split_sentences("   \n ").is_empty());
    }

    #[test]
    fn lexicon_polarity() {
        assert_eq!(summarize("This is great and wonderful").sentiment, Sentiment::Positive);
        assert_eq!(summarize("This is terrible and awful").sentiment, Sentiment::Negative);
        assert_eq!(summarize("The committee met on Tuesday").sentiment, Sentiment::Neutral);
        assert_eq!(sentiment_score("great, GREAT!"), 6);
    }

    #[test]
    fn negators_flip_the_next_word() {
        assert_eq!(sentiment_score("This is not good"), -3);
        assert_eq!(sentiment_score("It wasn’t bad at all"), 3);
        assert_eq!(classify(sentiment_score("not good, not bad")), Sentiment::Neutral);
    }
}
