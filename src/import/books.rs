#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    /// USFM-style book code, used in API paths and stored with each verse.
    pub code: &'static str,
    pub name: &'static str,
    pub chapters: u32,
}

const fn book(code: &'static str, name: &'static str, chapters: u32) -> Book {
    Book {
        code,
        name,
        chapters,
    }
}

/// The 66-book Protestant canon with Indonesian (TB) names.
pub const CANON: &[Book] = &[
    book("GEN", "Kejadian", 50),
    book("EXO", "Keluaran", 40),
    book("LEV", "Imamat", 27),
    book("NUM", "Bilangan", 36),
    book("DEU", "Ulangan", 34),
    book("JOS", "Yosua", 24),
    book("JDG", "Hakim-hakim", 21),
    book("RUT", "Rut", 4),
    book("1SA", "1 Samuel", 31),
    book("2SA", "2 Samuel", 24),
    book("1KI", "1 Raja-raja", 22),
    book("2KI", "2 Raja-raja", 25),
    book("1CH", "1 Tawarikh", 29),
    book("2CH", "2 Tawarikh", 36),
    book("EZR", "Ezra", 10),
    book("NEH", "Nehemia", 13),
    book("EST", "Ester", 10),
    book("JOB", "Ayub", 42),
    book("PSA", "Mazmur", 150),
    book("PRO", "Amsal", 31),
    book("ECC", "Pengkhotbah", 12),
    book("SNG", "Kidung Agung", 8),
    book("ISA", "Yesaya", 66),
    book("JER", "Yeremia", 52),
    book("LAM", "Ratapan", 5),
    book("EZK", "Yehezkiel", 48),
    book("DAN", "Daniel", 12),
    book("HOS", "Hosea", 14),
    book("JOL", "Yoel", 3),
    book("AMO", "Amos", 9),
    book("OBA", "Obaja", 1),
    book("JON", "Yunus", 4),
    book("MIC", "Mikha", 7),
    book("NAM", "Nahum", 3),
    book("HAB", "Habakuk", 3),
    book("ZEP", "Zefanya", 3),
    book("HAG", "Hagai", 2),
    book("ZEC", "Zakharia", 14),
    book("MAL", "Maleakhi", 4),
    book("MAT", "Matius", 28),
    book("MRK", "Markus", 16),
    book("LUK", "Lukas", 24),
    book("JHN", "Yohanes", 21),
    book("ACT", "Kisah Para Rasul", 28),
    book("ROM", "Roma", 16),
    book("1CO", "1 Korintus", 16),
    book("2CO", "2 Korintus", 13),
    book("GAL", "Galatia", 6),
    book("EPH", "Efesus", 6),
    book("PHP", "Filipi", 4),
    book("COL", "Kolose", 4),
    book("1TH", "1 Tesalonika", 5),
    book("2TH", "2 Tesalonika", 3),
    book("1TI", "1 Timotius", 6),
    book("2TI", "2 Timotius", 4),
    book("TIT", "Titus", 3),
    book("PHM", "Filemon", 1),
    book("HEB", "Ibrani", 13),
    book("JAS", "Yakobus", 5),
    book("1PE", "1 Petrus", 5),
    book("2PE", "2 Petrus", 3),
    book("1JN", "1 Yohanes", 5),
    book("2JN", "2 Yohanes", 1),
    book("3JN", "3 Yohanes", 1),
    book("JUD", "Yudas", 1),
    book("REV", "Wahyu", 22),
];

pub fn find_book(code: &str) -> Option<&'static Book> {
    CANON.iter().find(|b| b.code.eq_ignore_ascii_case(code.trim()))
}
