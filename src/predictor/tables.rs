//! Hand-authored substitution tables for the Kazakh keyboard layout.
//!
//! Both tables are closed maps from a Cyrillic code point to a short ordered
//! list of alternatives, first element most likely. A letter with no row has
//! no substitution at that position.

/// Likely mistypes for `c` on the Kazakh keyboard.
pub fn keyboard_neighbors(c: char) -> &'static [char] {
    match c {
        'а' => &['ф', 'с'],
        'б' => &['и', 'ю'],
        'в' => &['ц', 'ф'],
        'г' => &['р', 'т'],
        'ғ' => &['р', 'т'],
        'д' => &['л', 'ш'],
        'е' => &['к', 'н'],
        'ж' => &['э', 'з'],
        'з' => &['ж', 'ъ'],
        'и' => &['ш', 'щ'],
        'й' => &['ф', 'ы'],
        'к' => &['л', 'е'],
        'қ' => &['л', 'ш'],
        'л' => &['д', 'к'],
        'м' => &['ь', 'т'],
        'н' => &['т', 'е'],
        'ң' => &['т', 'е'],
        'о' => &['а', 'л'],
        'ө' => &['л', 'д'],
        'п' => &['з', 'э'],
        'р' => &['к', 'е'],
        'с' => &['ы', 'в'],
        'т' => &['н', 'м'],
        'у' => &['г', 'ш'],
        'ұ' => &['г', 'ш'],
        'ү' => &['г', 'ш'],
        'ф' => &['а', 'в'],
        'х' => &['ъ', 'з'],
        'һ' => &['ъ', 'з'],
        'ц' => &['у', 'к'],
        'ч' => &['с', 'м'],
        'ш' => &['щ', 'и'],
        'щ' => &['ш', 'и'],
        'ъ' => &['э', 'ж'],
        'ы' => &['ф', 'в'],
        'і' => &['ш', 'щ'],
        'ь' => &['б', 'ю'],
        'э' => &['ъ', 'ж'],
        'ю' => &['ѫ', 'б'],
        'я' => &['ф', 'ц'],
        _ => &[],
    }
}

/// Kazakh phonetic equivalence partners: the eight bidirectional pairs
/// ә↔а, ң↔н, і↔и, қ↔к, ғ↔г, ү↔у, ө↔о, һ↔х.
pub fn phonetic_partners(c: char) -> &'static [char] {
    match c {
        'ә' => &['а'],
        'а' => &['ә'],
        'ң' => &['н'],
        'н' => &['ң'],
        'і' => &['и'],
        'и' => &['і'],
        'қ' => &['к'],
        'к' => &['қ'],
        'ғ' => &['г'],
        'г' => &['ғ'],
        'ү' => &['у'],
        'у' => &['ү'],
        'ө' => &['о'],
        'о' => &['ө'],
        'һ' => &['х'],
        'х' => &['һ'],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phonetic_pairs_are_symmetric() {
        for (a, b) in [
            ('ә', 'а'),
            ('ң', 'н'),
            ('і', 'и'),
            ('қ', 'к'),
            ('ғ', 'г'),
            ('ү', 'у'),
            ('ө', 'о'),
            ('һ', 'х'),
        ] {
            assert_eq!(phonetic_partners(a), &[b]);
            assert_eq!(phonetic_partners(b), &[a]);
        }
    }

    #[test]
    fn keyboard_rows_are_small_and_closed() {
        for c in "абвгғдежзийкқлмнңоөпрстуұүфхһцчшщъыіьэюя".chars() {
            let row = keyboard_neighbors(c);
            assert!(!row.is_empty());
            assert!(row.len() <= 3);
        }
        assert!(keyboard_neighbors('k').is_empty());
        assert!(keyboard_neighbors('ё').is_empty());
    }
}
