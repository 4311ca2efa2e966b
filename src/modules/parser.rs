// index of the category (chapter) code in a data row
pub const CATEGORY_FIELD: usize = 3;

// name fields that are stored entity-escaped
const ESCAPED_FIELDS: [usize; 2] = [1, 2];

// named entities for U+00A0..=U+00FF, in code point order
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect",
    "uml", "copy", "ordf", "laquo", "not", "shy", "reg", "macr",
    "deg", "plusmn", "sup2", "sup3", "acute", "micro", "para", "middot",
    "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil",
    "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml",
    "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc", "Otilde", "Ouml", "times",
    "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute", "THORN", "szlig",
    "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml",
    "eth", "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide",
    "oslash", "ugrave", "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

// remaining HTML 4.01 named entities above U+00FF, sorted by code point
const EXTENDED_ENTITIES: &[(char, &str)] = &[
    ('\u{152}', "OElig"), ('\u{153}', "oelig"), ('\u{160}', "Scaron"), ('\u{161}', "scaron"),
    ('\u{178}', "Yuml"), ('\u{192}', "fnof"), ('\u{2c6}', "circ"), ('\u{2dc}', "tilde"),
    ('\u{391}', "Alpha"), ('\u{392}', "Beta"), ('\u{393}', "Gamma"), ('\u{394}', "Delta"),
    ('\u{395}', "Epsilon"), ('\u{396}', "Zeta"), ('\u{397}', "Eta"), ('\u{398}', "Theta"),
    ('\u{399}', "Iota"), ('\u{39a}', "Kappa"), ('\u{39b}', "Lambda"), ('\u{39c}', "Mu"),
    ('\u{39d}', "Nu"), ('\u{39e}', "Xi"), ('\u{39f}', "Omicron"), ('\u{3a0}', "Pi"),
    ('\u{3a1}', "Rho"), ('\u{3a3}', "Sigma"), ('\u{3a4}', "Tau"), ('\u{3a5}', "Upsilon"),
    ('\u{3a6}', "Phi"), ('\u{3a7}', "Chi"), ('\u{3a8}', "Psi"), ('\u{3a9}', "Omega"),
    ('\u{3b1}', "alpha"), ('\u{3b2}', "beta"), ('\u{3b3}', "gamma"), ('\u{3b4}', "delta"),
    ('\u{3b5}', "epsilon"), ('\u{3b6}', "zeta"), ('\u{3b7}', "eta"), ('\u{3b8}', "theta"),
    ('\u{3b9}', "iota"), ('\u{3ba}', "kappa"), ('\u{3bb}', "lambda"), ('\u{3bc}', "mu"),
    ('\u{3bd}', "nu"), ('\u{3be}', "xi"), ('\u{3bf}', "omicron"), ('\u{3c0}', "pi"),
    ('\u{3c1}', "rho"), ('\u{3c2}', "sigmaf"), ('\u{3c3}', "sigma"), ('\u{3c4}', "tau"),
    ('\u{3c5}', "upsilon"), ('\u{3c6}', "phi"), ('\u{3c7}', "chi"), ('\u{3c8}', "psi"),
    ('\u{3c9}', "omega"), ('\u{3d1}', "thetasym"), ('\u{3d2}', "upsih"), ('\u{3d6}', "piv"),
    ('\u{2002}', "ensp"), ('\u{2003}', "emsp"), ('\u{2009}', "thinsp"), ('\u{200c}', "zwnj"),
    ('\u{200d}', "zwj"), ('\u{200e}', "lrm"), ('\u{200f}', "rlm"), ('\u{2013}', "ndash"),
    ('\u{2014}', "mdash"), ('\u{2018}', "lsquo"), ('\u{2019}', "rsquo"), ('\u{201a}', "sbquo"),
    ('\u{201c}', "ldquo"), ('\u{201d}', "rdquo"), ('\u{201e}', "bdquo"), ('\u{2020}', "dagger"),
    ('\u{2021}', "Dagger"), ('\u{2022}', "bull"), ('\u{2026}', "hellip"), ('\u{2030}', "permil"),
    ('\u{2032}', "prime"), ('\u{2033}', "Prime"), ('\u{2039}', "lsaquo"), ('\u{203a}', "rsaquo"),
    ('\u{203e}', "oline"), ('\u{2044}', "frasl"), ('\u{20ac}', "euro"), ('\u{2111}', "image"),
    ('\u{2118}', "weierp"), ('\u{211c}', "real"), ('\u{2122}', "trade"), ('\u{2135}', "alefsym"),
    ('\u{2190}', "larr"), ('\u{2191}', "uarr"), ('\u{2192}', "rarr"), ('\u{2193}', "darr"),
    ('\u{2194}', "harr"), ('\u{21b5}', "crarr"), ('\u{21d0}', "lArr"), ('\u{21d1}', "uArr"),
    ('\u{21d2}', "rArr"), ('\u{21d3}', "dArr"), ('\u{21d4}', "hArr"), ('\u{2200}', "forall"),
    ('\u{2202}', "part"), ('\u{2203}', "exist"), ('\u{2205}', "empty"), ('\u{2207}', "nabla"),
    ('\u{2208}', "isin"), ('\u{2209}', "notin"), ('\u{220b}', "ni"), ('\u{220f}', "prod"),
    ('\u{2211}', "sum"), ('\u{2212}', "minus"), ('\u{2217}', "lowast"), ('\u{221a}', "radic"),
    ('\u{221d}', "prop"), ('\u{221e}', "infin"), ('\u{2220}', "ang"), ('\u{2227}', "and"),
    ('\u{2228}', "or"), ('\u{2229}', "cap"), ('\u{222a}', "cup"), ('\u{222b}', "int"),
    ('\u{2234}', "there4"), ('\u{223c}', "sim"), ('\u{2245}', "cong"), ('\u{2248}', "asymp"),
    ('\u{2260}', "ne"), ('\u{2261}', "equiv"), ('\u{2264}', "le"), ('\u{2265}', "ge"),
    ('\u{2282}', "sub"), ('\u{2283}', "sup"), ('\u{2284}', "nsub"), ('\u{2286}', "sube"),
    ('\u{2287}', "supe"), ('\u{2295}', "oplus"), ('\u{2297}', "otimes"), ('\u{22a5}', "perp"),
    ('\u{22c5}', "sdot"), ('\u{2308}', "lceil"), ('\u{2309}', "rceil"), ('\u{230a}', "lfloor"),
    ('\u{230b}', "rfloor"), ('\u{2329}', "lang"), ('\u{232a}', "rang"), ('\u{25ca}', "loz"),
    ('\u{2660}', "spades"), ('\u{2663}', "clubs"), ('\u{2665}', "hearts"), ('\u{2666}', "diams"),
];

pub struct Parser {
    category: i64,
}

impl Parser {

    pub fn new(category: i64) -> Parser {
        Parser {
            category: category
        }
    }

    pub fn category(&self) -> i64 {
        self.category
    }

    // the first record of the file becomes the column names
    pub fn build_header(&self, fields: &[String]) -> Vec<String> {
        fields.iter().map(|field| sanitize_identifier(field)).collect()
    }

    // a row is kept only when its category field is an integer equal to ours
    pub fn matches_category(&self, fields: &[String]) -> bool {
        match fields.get(CATEGORY_FIELD) {
            Some(field) => field.trim().parse::<i64>().map_or(false, |code| code == self.category),
            None => false,
        }
    }

    // convert a data record into the values stored in the table
    pub fn build_row(&self, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if ESCAPED_FIELDS.contains(&i) {
                    escape_html_entities(field)
                } else if field.is_empty() {
                    // columns are NOT NULL, keep a placeholder
                    " ".to_string()
                } else {
                    field.to_owned()
                }
            })
            .collect()
    }

    // filter and convert in one step, None when the row belongs to another category
    pub fn parse_row(&self, fields: &[String]) -> Option<Vec<String>> {
        if self.matches_category(fields) {
            Some(self.build_row(fields))
        } else {
            None
        }
    }
}

// lowercase, anything outside [a-zA-Z0-9'] becomes an underscore
pub fn sanitize_identifier(field: &str) -> String {
    field
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '\'' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

// escape html special characters (quotes included) and every HTML 4.01 named entity
pub fn escape_html_entities(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}'..='\u{ff}' => {
                escaped.push('&');
                escaped.push_str(LATIN1_ENTITIES[c as usize - 0xa0]);
                escaped.push(';');
            }
            _ => match EXTENDED_ENTITIES.binary_search_by_key(&c, |&(code, _)| code) {
                Ok(index) => {
                    escaped.push('&');
                    escaped.push_str(EXTENDED_ENTITIES[index].1);
                    escaped.push(';');
                }
                Err(_) => escaped.push(c),
            },
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn sanitize_replaces_and_lowercases() {
        assert_eq!(sanitize_identifier("Member ID"), "member_id");
        assert_eq!(sanitize_identifier("Dept/Unit #"), "dept_unit__");
        assert_eq!(sanitize_identifier("Owner's Name"), "owner's_name");
        // one underscore per character, not per utf-8 byte
        assert_eq!(sanitize_identifier("Café"), "caf_");
    }

    #[test]
    fn sanitize_is_idempotent_and_keeps_order() {
        let parser = Parser::new(5);
        let header = fields(&["Employee ID", "Last-Name", "First Name", "CHAPTER", "É.t.c"]);

        let once = parser.build_header(&header);
        let twice = parser.build_header(&once);

        assert_eq!(once, twice);
        // É and each dot become a single underscore
        assert_eq!(once, fields(&["employee_id", "last_name", "first_name", "chapter", "__t_c"]));
    }

    #[test]
    fn escape_quotes_and_ampersand() {
        assert_eq!(escape_html_entities("O'Brien & Co"), "O&#039;Brien &amp; Co");
        assert_eq!(escape_html_entities("<b>\"x\"</b>"), "&lt;b&gt;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn escape_latin1_entities() {
        assert_eq!(escape_html_entities("Muñoz"), "Mu&ntilde;oz");
        assert_eq!(escape_html_entities("José ©"), "Jos&eacute; &copy;");
        assert_eq!(escape_html_entities("Ærø ÿ"), "&AElig;r&oslash; &yuml;");
        assert_eq!(escape_html_entities("Łukasz"), "Łukasz");
    }

    #[test]
    fn escape_entities_beyond_latin1() {
        assert_eq!(escape_html_entities("O\u{2019}Brien"), "O&rsquo;Brien");
        assert_eq!(escape_html_entities("Dash — x"), "Dash &mdash; x");
        assert_eq!(escape_html_entities("€5"), "&euro;5");
        assert_eq!(escape_html_entities("Œuvre"), "&OElig;uvre");
        assert_eq!(escape_html_entities("Σ ≤ π ♦"), "&Sigma; &le; &pi; &diams;");
        // no named entity, passed through
        assert_eq!(escape_html_entities("Ż 中"), "Ż 中");
    }

    #[test]
    fn extended_entities_are_sorted() {
        assert!(EXTENDED_ENTITIES.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn retains_only_matching_category_in_order() {
        let parser = Parser::new(5);
        let rows = vec![
            fields(&["1", "a", "b", "5"]),
            fields(&["2", "c", "d", "6"]),
            fields(&["3", "e", "f", "5"]),
        ];

        let kept: Vec<Vec<String>> = rows.iter().filter_map(|row| parser.parse_row(row)).collect();

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0][0], "1");
        assert_eq!(kept[1][0], "3");
    }

    #[test]
    fn category_must_be_an_integer() {
        let parser = Parser::new(5);
        assert!(parser.matches_category(&fields(&["1", "a", "b", " 5 "])));
        assert!(parser.matches_category(&fields(&["1", "a", "b", "+5"])));
        assert!(!parser.matches_category(&fields(&["1", "a", "b", "5.0"])));
        assert!(!parser.matches_category(&fields(&["1", "a", "b", "five"])));
        assert!(!parser.matches_category(&fields(&["1", "a", "b", ""])));
        assert!(!parser.matches_category(&fields(&["1", "a", "b"])));
    }

    #[test]
    fn build_row_fills_empty_and_escapes_names() {
        let parser = Parser::new(5);
        let row = parser.build_row(&fields(&["7", "O'Brien & Co", "", "5", "x", "", "y'z"]));

        assert_eq!(row[1], "O&#039;Brien &amp; Co");
        // escaped fields are not padded
        assert_eq!(row[2], "");
        assert_eq!(row[5], " ");
        // only fields 1 and 2 are escaped
        assert_eq!(row[6], "y'z");
        assert_eq!(row.len(), 7);
    }
}
