//! The 32 current NHL clubs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NhlTeam {
    pub abbrev: &'static str,
    /// Path segment of the club's PuckPedia cap page
    pub puckpedia_slug: &'static str,
}

const fn team(abbrev: &'static str, puckpedia_slug: &'static str) -> NhlTeam {
    NhlTeam {
        abbrev,
        puckpedia_slug,
    }
}

pub const NHL_TEAMS: [NhlTeam; 32] = [
    team("ANA", "anaheim-ducks"),
    team("BOS", "boston-bruins"),
    team("BUF", "buffalo-sabres"),
    team("CAR", "carolina-hurricanes"),
    team("CBJ", "columbus-blue-jackets"),
    team("CGY", "calgary-flames"),
    team("CHI", "chicago-blackhawks"),
    team("COL", "colorado-avalanche"),
    team("DAL", "dallas-stars"),
    team("DET", "detroit-red-wings"),
    team("EDM", "edmonton-oilers"),
    team("FLA", "florida-panthers"),
    team("LAK", "los-angeles-kings"),
    team("MIN", "minnesota-wild"),
    team("MTL", "montreal-canadiens"),
    team("NJD", "new-jersey-devils"),
    team("NSH", "nashville-predators"),
    team("NYI", "new-york-islanders"),
    team("NYR", "new-york-rangers"),
    team("OTT", "ottawa-senators"),
    team("PHI", "philadelphia-flyers"),
    team("PIT", "pittsburgh-penguins"),
    team("SEA", "seattle-kraken"),
    team("SJS", "san-jose-sharks"),
    team("STL", "st-louis-blues"),
    team("TBL", "tampa-bay-lightning"),
    team("TOR", "toronto-maple-leafs"),
    team("UTA", "utah-hockey-club"),
    team("VAN", "vancouver-canucks"),
    team("VGK", "vegas-golden-knights"),
    team("WPG", "winnipeg-jets"),
    team("WSH", "washington-capitals"),
];

pub fn all_abbrevs() -> Vec<String> {
    NHL_TEAMS.iter().map(|t| t.abbrev.to_string()).collect()
}

pub fn find(abbrev: &str) -> Option<&'static NhlTeam> {
    NHL_TEAMS.iter().find(|t| t.abbrev.eq_ignore_ascii_case(abbrev))
}
