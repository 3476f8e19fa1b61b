pub const SCHEMA: &str = r#"
-- devotionals table (renungan)
CREATE TABLE IF NOT EXISTS devotionals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    date TEXT NOT NULL,
    key_verse TEXT,
    reference TEXT,
    body TEXT NOT NULL DEFAULT '',
    hymn TEXT,
    prayer TEXT,
    quote TEXT,
    source TEXT NOT NULL DEFAULT 'manual' CHECK (source IN ('manual', 'synced')),
    source_url TEXT UNIQUE,
    visible INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_devotionals_visible_date ON devotionals(visible, date DESC);
CREATE INDEX IF NOT EXISTS idx_devotionals_source ON devotionals(source);

-- bible_verses table (bulk import target)
CREATE TABLE IF NOT EXISTS bible_verses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book TEXT NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    translation TEXT NOT NULL,
    text TEXT NOT NULL,
    imported_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(book, chapter, verse, translation)
);

CREATE INDEX IF NOT EXISTS idx_bible_verses_lookup ON bible_verses(translation, book, chapter);
"#;
