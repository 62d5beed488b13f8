//! Синхронизатор с подсказкой индекса

use std::sync::Arc;
use crate::timing::WordTiming;
use super::{sanitize_elapsed, word_progress, KaraokeCursor};

/// Синхронизатор курсора для одной секции
///
/// Хранит индекс последнего найденного слова. При монотонном росте времени
/// поиск сводится к проверке подсказки и короткому проходу вперед, при
/// перемотке назад используется двоичный поиск. Результат всегда совпадает
/// с [`super::locate_cursor`].
#[derive(Debug, Clone)]
pub struct KaraokeSync {
    timings: Arc<[WordTiming]>,
    hint: usize,
}

impl KaraokeSync {
    pub fn new(timings: Arc<[WordTiming]>) -> Self {
        Self { timings, hint: 0 }
    }

    pub fn timings(&self) -> &[WordTiming] {
        &self.timings
    }

    pub fn reset(&mut self) {
        self.hint = 0;
    }

    pub fn finished(&self) -> KaraokeCursor {
        KaraokeCursor::finished(&self.timings)
    }

    pub fn cursor_at(&mut self, elapsed_ms: f64) -> KaraokeCursor {
        let timings = &self.timings;
        let (Some(first), Some(last)) = (timings.first(), timings.last()) else {
            return KaraokeCursor::before_first();
        };
        let elapsed = sanitize_elapsed(elapsed_ms);

        if elapsed < first.start_ms as f64 {
            self.hint = 0;
            return KaraokeCursor::before_first();
        }
        if elapsed >= last.end_ms as f64 {
            self.hint = timings.len() - 1;
            return KaraokeCursor::finished(timings);
        }

        let hint = self.hint.min(timings.len() - 1);
        let index = if timings[hint].start_ms as f64 <= elapsed {
            let mut i = hint;
            while i + 1 < timings.len() && timings[i + 1].start_ms as f64 <= elapsed {
                i += 1;
            }
            i
        } else {
            timings
                .partition_point(|t| t.start_ms as f64 <= elapsed)
                .saturating_sub(1)
        };

        self.hint = index;
        KaraokeCursor::word(index, word_progress(&timings[index], elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::karaoke::{locate_cursor, CursorPosition};
    use crate::timing::generate_timings;

    fn section() -> Arc<[WordTiming]> {
        let words = ["אַשְׁרֵי", "יוֹשְׁבֵי", "בֵיתֶךָ", "עוֹד", "יְהַלְלוּךָ", "סֶּלָה"];
        generate_timings(&words, 9000, &TimingConfig::default()).into()
    }

    #[test]
    fn test_index_never_decreases() {
        let timings = section();
        let mut sync = KaraokeSync::new(timings.clone());
        let mut last_index: Option<usize> = None;

        let mut t = 0.0;
        while t <= 9100.0 {
            let cursor = sync.cursor_at(t);
            let index = cursor.word_index();
            assert!(index >= last_index, "index went back at {}ms", t);
            assert!((0.0..=1.0).contains(&cursor.progress));
            last_index = index;
            t += 7.0;
        }
        assert_eq!(last_index, Some(timings.len() - 1));
    }

    #[test]
    fn test_matches_stateless_lookup_after_seeks() {
        let timings = section();
        let mut sync = KaraokeSync::new(timings.clone());

        for elapsed in [0.0, 500.0, 4200.0, 1800.0, 8999.0, 120.0, 3000.0, 3000.0, -1.0, 9500.0, 2000.0] {
            assert_eq!(sync.cursor_at(elapsed), locate_cursor(&timings, elapsed), "at {}ms", elapsed);
        }
    }

    #[test]
    fn test_empty_section() {
        let mut sync = KaraokeSync::new(Vec::<WordTiming>::new().into());
        assert_eq!(sync.cursor_at(1000.0).position, CursorPosition::BeforeFirst);
        assert_eq!(sync.finished().progress, 0.0);
    }
}
