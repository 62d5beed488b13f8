//! Пропорциональное распределение длительности клипа по словам
//!
//! Длительность речи (клип без начальной и конечной тишины) делится между
//! словами пропорционально их весу. Внутри доли каждого слова небольшая
//! часть отводится под паузу, поэтому подсветка гаснет чуть раньше начала
//! следующего слова.

use log::{debug, warn};
use crate::config::TimingConfig;
use super::weight::{HebrewConsonantRule, WeightRule};
use super::WordTiming;

/// Сгенерировать тайминги для слов на иврите
pub fn generate_timings<S: AsRef<str>>(
    words: &[S],
    total_duration_ms: u64,
    config: &TimingConfig,
) -> Vec<WordTiming> {
    generate_timings_with_rule(words, total_duration_ms, config, &HebrewConsonantRule)
}

/// Сгенерировать тайминги с заданным правилом веса
pub fn generate_timings_with_rule<S: AsRef<str>>(
    words: &[S],
    total_duration_ms: u64,
    config: &TimingConfig,
    rule: &dyn WeightRule,
) -> Vec<WordTiming> {
    if words.is_empty() {
        return Vec::new();
    }

    let total = total_duration_ms as f64;
    let leading_buffer = config.leading_buffer_max_ms.min(total * config.leading_buffer_ratio);
    let trailing_buffer = config.trailing_buffer_max_ms.min(total * config.trailing_buffer_ratio);
    let speaking_time = total - leading_buffer - trailing_buffer;

    if speaking_time <= 0.0 {
        debug!(
            "Clip of {} ms is too short for buffers, splitting {} words evenly",
            total_duration_ms,
            words.len()
        );
        return uniform_timings(words, total);
    }

    let weights: Vec<f64> = words.iter().map(|w| rule.weight(w.as_ref()) as f64).collect();
    let total_weight: f64 = weights.iter().sum();

    let mut timings = Vec::with_capacity(words.len());
    let mut cursor = leading_buffer;

    for (word, weight) in words.iter().zip(&weights) {
        let word_duration = weight / total_weight * speaking_time;
        let gap = word_duration * config.word_gap_ratio;
        let effective_duration = word_duration - gap;

        timings.push(WordTiming::new(
            word.as_ref(),
            round_ms(cursor),
            round_ms(cursor + effective_duration),
        ));

        cursor += word_duration;
    }

    if let Some(last) = timings.last_mut() {
        last.end_ms = round_ms(total - trailing_buffer);
    }

    timings
}

fn uniform_timings<S: AsRef<str>>(words: &[S], total: f64) -> Vec<WordTiming> {
    let per_word = total / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            WordTiming::new(
                word.as_ref(),
                round_ms(i as f64 * per_word),
                round_ms((i + 1) as f64 * per_word),
            )
        })
        .collect()
}

// Значения неотрицательны, поэтому округление совпадает с "половина вверх".
fn round_ms(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// Предупреждение о качестве таймингов
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingWarning {
    pub index: usize,
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Найти слова с неположительной длительностью
///
/// Такие интервалы не являются ошибкой: синхронизатор считает их мгновенными.
pub fn timing_warnings(timings: &[WordTiming]) -> Vec<TimingWarning> {
    let warnings: Vec<TimingWarning> = timings
        .iter()
        .enumerate()
        .filter(|(_, t)| t.end_ms <= t.start_ms)
        .map(|(index, t)| TimingWarning {
            index,
            word: t.word.clone(),
            start_ms: t.start_ms,
            end_ms: t.end_ms,
        })
        .collect();

    for w in &warnings {
        warn!(
            "Word {} ({}) has a non-positive interval [{}, {}]",
            w.index, w.word, w.start_ms, w.end_ms
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::weight::{split_words, AlphabeticRule};

    fn defaults() -> TimingConfig {
        TimingConfig::default()
    }

    #[test]
    fn test_empty_words() {
        let words: Vec<String> = Vec::new();
        assert!(generate_timings(&words, 5000, &defaults()).is_empty());
    }

    #[test]
    fn test_two_equal_words() {
        let words = ["שָׁלוֹם", "עוֹלָם"];
        let timings = generate_timings(&words, 2000, &defaults());

        // leading 60, trailing 40, speaking 1900, 950 на слово, пауза 47.5
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].word, "שָׁלוֹם");
        assert_eq!(timings[0].start_ms, 60);
        assert_eq!(timings[0].end_ms, 963);
        assert_eq!(timings[1].start_ms, 1010);
        assert_eq!(timings[1].end_ms, 1960);
    }

    #[test]
    fn test_coverage_and_monotonic_starts() {
        let text = "מוֹדֶה אֲנִי לְפָנֶיךָ מֶלֶךְ חַי וְקַיָּם שֶׁהֶחֱזַרְתָּ בִּי נִשְׁמָתִי בְּחֶמְלָה רַבָּה אֱמוּנָתֶךָ";
        let words = split_words(text);

        for total in [1u64, 37, 999, 4_321, 60_000, 3_600_000] {
            let timings = generate_timings(&words, total, &defaults());
            assert_eq!(timings.len(), words.len());
            for (t, w) in timings.iter().zip(&words) {
                assert_eq!(&t.word, w);
            }
            for pair in timings.windows(2) {
                assert!(pair[0].start_ms <= pair[1].start_ms, "total {}", total);
            }
        }
    }

    #[test]
    fn test_positive_intervals_for_regular_clip() {
        let words = split_words("בָּרוּךְ אַתָּה יְיָ אֱלֹהֵינוּ מֶלֶךְ הָעוֹלָם");
        let timings = generate_timings(&words, 6_000, &defaults());
        assert!(timings.iter().all(|t| t.start_ms < t.end_ms));
        assert!(timing_warnings(&timings).is_empty());
    }

    #[test]
    fn test_end_anchored_to_trailing_buffer() {
        let words = split_words("אָשֵׁר יָצַר אֶת הָאָדָם בְּחָכְמָה");

        // буфер ограничен 150 мс
        let timings = generate_timings(&words, 20_000, &defaults());
        assert_eq!(timings.last().unwrap().end_ms, 19_850);

        // 2% от 1234 = 24.68
        let timings = generate_timings(&words, 1_234, &defaults());
        assert_eq!(timings.last().unwrap().end_ms, 1_209);
    }

    #[test]
    fn test_zero_duration_degenerates_to_instant_words() {
        let words = ["אָמֵן", "אָמֵן"];
        let timings = generate_timings(&words, 0, &defaults());
        assert_eq!(timings.len(), 2);
        assert!(timings.iter().all(|t| t.start_ms == 0 && t.end_ms == 0));
        assert_eq!(timing_warnings(&timings).len(), 2);
    }

    #[test]
    fn test_uniform_split_without_buffers() {
        // Буферы съедают весь клип, остается равномерное деление
        let config = TimingConfig {
            leading_buffer_ratio: 0.6,
            trailing_buffer_ratio: 0.5,
            leading_buffer_max_ms: 1_000.0,
            trailing_buffer_max_ms: 1_000.0,
            ..TimingConfig::default()
        };
        let words = ["א", "בב", "גגג"];
        let timings = generate_timings(&words, 100, &config);

        assert_eq!(timings[0].start_ms, 0);
        assert_eq!(timings[0].end_ms, 33);
        assert_eq!(timings[1].start_ms, 33);
        assert_eq!(timings[1].end_ms, 67);
        assert_eq!(timings[2].start_ms, 67);
        assert_eq!(timings[2].end_ms, 100);
    }

    #[test]
    fn test_heavier_word_gets_proportional_share() {
        let words = ["אב", "אבגד"];
        let timings = generate_timings(&words, 10_000, &defaults());

        // Номинальная доля первого слова: до начала второго.
        // Последнее слово растянуто до конца речи, это и есть его доля.
        let light = (timings[1].start_ms - timings[0].start_ms) as f64;
        let heavy = timings[1].duration_ms() as f64;
        let ratio = heavy / light;
        assert!((ratio - 2.0).abs() < 0.1, "ratio {}", ratio);

        let light_effective = timings[0].duration_ms() as f64;
        assert!((light_effective - light * 0.95).abs() <= 1.0);
    }

    #[test]
    fn test_transliteration_rule() {
        let words = ["Baruch", "Ata"];
        let timings =
            generate_timings_with_rule(&words, 9_000, &defaults(), &AlphabeticRule);
        assert!(timings[0].duration_ms() > timings[1].duration_ms());
    }
}
