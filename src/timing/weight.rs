//! Вес слова как приближение длительности его произнесения

/// Правило подсчета веса слова
pub trait WeightRule: Send + Sync {
    /// Учитывается ли символ при подсчете веса
    fn is_weight_bearing(&self, c: char) -> bool;

    /// Вес слова: число учитываемых символов, не меньше 1
    fn weight(&self, word: &str) -> u32 {
        let count = word.chars().filter(|c| self.is_weight_bearing(*c)).count() as u32;
        count.max(1)
    }
}

/// Согласные иврита (U+05D0..=U+05EA). Огласовки, кантилляция и макаф не учитываются.
#[derive(Debug, Clone, Copy, Default)]
pub struct HebrewConsonantRule;

impl WeightRule for HebrewConsonantRule {
    fn is_weight_bearing(&self, c: char) -> bool {
        ('\u{05D0}'..='\u{05EA}').contains(&c)
    }
}

/// Буквы любого алфавита; для транслитерации
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphabeticRule;

impl WeightRule for AlphabeticRule {
    fn is_weight_bearing(&self, c: char) -> bool {
        c.is_alphabetic()
    }
}

/// Вес слова на иврите
pub fn word_weight(word: &str) -> u32 {
    HebrewConsonantRule.weight(word)
}

/// Разбить текст на слова по пробельным символам
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
