/*!
Conversion degrés décimaux → degrés/minutes sexagésimaux NMEA

Format NMEA 0183 :
```text
5603.370,N     latitude  : ddmm.mmm  (degrés sur 2 chiffres)
01859.976,E    longitude : dddmm.mmm (degrés sur 3 chiffres)
```

Les minutes sont arrondies au millième le plus proche, moitié loin de zéro
(`f64::round`). Si l'arrondi atteint 60.000, la retenue passe sur les degrés
(ex: 3°59.9995' → 4°00.000').
*/

/// Largeur du champ degrés pour une latitude
pub const LATITUDE_DEGREE_WIDTH: usize = 2;

/// Largeur du champ degrés pour une longitude
pub const LONGITUDE_DEGREE_WIDTH: usize = 3;

/// Millièmes de minute dans un degré
const MILLI_MINUTES_PER_DEGREE: u32 = 60_000;

/// Biais ajouté avant l'arrondi (en millièmes de minute)
/// `(x - floor(x)) * 60_000` perd jusqu'à ~3e-9 pour |x| <= 180 : sans biais,
/// 59.9995' donne 59999.49999... et n'est pas arrondi vers le haut
const ROUNDING_BIAS: f64 = 1e-6;

/// Valeur sexagésimale dérivée d'une coordonnée décimale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sexagesimal {
    /// Degrés entiers (valeur absolue)
    pub degrees: u64,

    /// Minutes en millièmes (0..=59_999)
    pub milli_minutes: u32,

    /// Lettre d'hémisphère (N/S/E/W)
    pub hemisphere: char,
}

impl Sexagesimal {
    /// Minutes formatées `mm.mmm`
    pub fn minutes(&self) -> String {
        format!(
            "{:02}.{:03}",
            self.milli_minutes / 1000,
            self.milli_minutes % 1000
        )
    }

    /// Champ complet `d..dmm.mmm` avec les degrés complétés à `degree_width` chiffres
    pub fn field(&self, degree_width: usize) -> String {
        format!(
            "{:0width$}{}",
            self.degrees,
            self.minutes(),
            width = degree_width
        )
    }
}

/// Convertit une valeur décimale signée en degrés/minutes + hémisphère
///
/// Le signe choisit la lettre : `positive` pour une valeur >= 0, `negative` sinon.
/// La valeur doit être finie (vérifié par le constructeur de trames).
pub fn encode(value: f64, positive: char, negative: char) -> Sexagesimal {
    let hemisphere = if value < 0.0 { negative } else { positive };

    let abs_value = value.abs();
    let whole = abs_value.floor();
    let minutes = (abs_value - whole) * 60.0;

    // `as` sature pour les valeurs hors plage
    let mut degrees = whole as u64;
    let mut milli_minutes = (minutes * 1000.0 + ROUNDING_BIAS).round() as u32;

    // Retenue de l'arrondi : 59.9995' et plus deviennent 00.000' du degré suivant
    if milli_minutes >= MILLI_MINUTES_PER_DEGREE {
        degrees = degrees.saturating_add(1);
        milli_minutes -= MILLI_MINUTES_PER_DEGREE;
    }

    Sexagesimal {
        degrees,
        milli_minutes,
        hemisphere,
    }
}

/// Latitude : N pour >= 0, S sinon
pub fn encode_latitude(value: f64) -> Sexagesimal {
    encode(value, 'N', 'S')
}

/// Longitude : E pour >= 0, W sinon
pub fn encode_longitude(value: f64) -> Sexagesimal {
    encode(value, 'E', 'W')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Relit un champ `d..dmm.mmm` + hémisphère en degrés décimaux signés
    fn parse_field(field: &str, degree_width: usize, hemisphere: char) -> f64 {
        let degrees: f64 = field[..degree_width].parse().unwrap();
        let minutes: f64 = field[degree_width..].parse().unwrap();
        let value = degrees + minutes / 60.0;
        if hemisphere == 'S' || hemisphere == 'W' {
            -value
        } else {
            value
        }
    }

    #[test]
    fn test_reference_latitude() {
        let lat = encode_latitude(56.05617);
        assert_eq!(lat.degrees, 56);
        assert_eq!(lat.minutes(), "03.370");
        assert_eq!(lat.hemisphere, 'N');
        assert_eq!(lat.field(LATITUDE_DEGREE_WIDTH), "5603.370");
    }

    #[test]
    fn test_reference_longitude() {
        let lon = encode_longitude(18.99960);
        assert_eq!(lon.degrees, 18);
        assert_eq!(lon.minutes(), "59.976");
        assert_eq!(lon.hemisphere, 'E');
        assert_eq!(lon.field(LONGITUDE_DEGREE_WIDTH), "01859.976");
    }

    #[test]
    fn test_hemispheres() {
        assert_eq!(encode_latitude(0.0).hemisphere, 'N');
        assert_eq!(encode_latitude(-0.5).hemisphere, 'S');
        assert_eq!(encode_longitude(0.0).hemisphere, 'E');
        assert_eq!(encode_longitude(-122.4).hemisphere, 'W');
    }

    #[test]
    fn test_negative_value_uses_absolute_magnitude() {
        let lat = encode_latitude(-33.5);
        assert_eq!(lat.degrees, 33);
        assert_eq!(lat.minutes(), "30.000");
        assert_eq!(lat.hemisphere, 'S');
    }

    #[test]
    fn test_rounding_carries_into_degrees() {
        // 3°59.9996' : les minutes arrondies atteignent 60.000
        let value = 3.0 + 59.9996 / 60.0;
        let lat = encode_latitude(value);
        assert_eq!(lat.degrees, 4);
        assert_eq!(lat.minutes(), "00.000");
        assert_eq!(lat.field(LATITUDE_DEGREE_WIDTH), "0400.000");

        let lon = encode_longitude(-(179.0 + 59.9999 / 60.0));
        assert_eq!(lon.degrees, 180);
        assert_eq!(lon.field(LONGITUDE_DEGREE_WIDTH), "18000.000");
        assert_eq!(lon.hemisphere, 'W');
    }

    #[test]
    fn test_half_milli_minute_carries() {
        // 59.9995' exactement : arrondi vers le haut, retenue sur les degrés
        let lat = encode_latitude(3.0 + 59.9995 / 60.0);
        assert_eq!(lat.field(LATITUDE_DEGREE_WIDTH), "0400.000");

        let lat = encode_latitude(-(45.0 + 59.9995 / 60.0));
        assert_eq!(lat.field(LATITUDE_DEGREE_WIDTH), "4600.000");
        assert_eq!(lat.hemisphere, 'S');

        let lon = encode_longitude(179.0 + 59.9995 / 60.0);
        assert_eq!(lon.field(LONGITUDE_DEGREE_WIDTH), "18000.000");

        // Juste sous la moitié : pas de retenue
        let lat = encode_latitude(3.0 + 59.99949 / 60.0);
        assert_eq!(lat.field(LATITUDE_DEGREE_WIDTH), "0359.999");
    }

    #[test]
    fn test_half_milli_minute_rounds_up_at_every_degree() {
        for degrees in 0..180 {
            let lon = encode_longitude(degrees as f64 + 12.3455 / 60.0);
            assert_eq!(lon.degrees, degrees);
            assert_eq!(lon.minutes(), "12.346", "at {} degrees", degrees);
        }
    }

    #[test]
    fn test_huge_values_do_not_overflow() {
        let value = encode(4294967295.9999995, 'E', 'W');
        assert_eq!(value.degrees, 4_294_967_296);
        assert_eq!(value.milli_minutes, 0);

        let value = encode(-f64::MAX, 'E', 'W');
        assert_eq!(value.degrees, u64::MAX);
        assert_eq!(value.hemisphere, 'W');
    }

    #[test]
    fn test_rounding_below_carry_threshold() {
        let value = 3.0 + 59.9994 / 60.0;
        let lat = encode_latitude(value);
        assert_eq!(lat.degrees, 3);
        assert_eq!(lat.minutes(), "59.999");
    }

    #[test]
    fn test_degree_padding_extremes() {
        assert_eq!(encode_latitude(0.0).field(LATITUDE_DEGREE_WIDTH), "0000.000");
        assert_eq!(encode_latitude(90.0).field(LATITUDE_DEGREE_WIDTH), "9000.000");
        assert_eq!(encode_longitude(7.25).field(LONGITUDE_DEGREE_WIDTH), "00715.000");
        assert_eq!(encode_longitude(180.0).field(LONGITUDE_DEGREE_WIDTH), "18000.000");
    }

    proptest! {
        #[test]
        fn prop_latitude_round_trip(value in -90.0f64..=90.0) {
            let lat = encode_latitude(value);
            let field = lat.field(LATITUDE_DEGREE_WIDTH);
            prop_assert_eq!(field.len(), 8);
            prop_assert_eq!(field.find('.'), Some(4));

            let parsed = parse_field(&field, LATITUDE_DEGREE_WIDTH, lat.hemisphere);
            // 1/1000 de minute
            prop_assert!((parsed - value).abs() <= 0.001 / 60.0 + 1e-9);
        }

        #[test]
        fn prop_longitude_round_trip(value in -180.0f64..=180.0) {
            let lon = encode_longitude(value);
            let field = lon.field(LONGITUDE_DEGREE_WIDTH);
            prop_assert_eq!(field.len(), 9);
            prop_assert_eq!(field.find('.'), Some(5));

            let parsed = parse_field(&field, LONGITUDE_DEGREE_WIDTH, lon.hemisphere);
            prop_assert!((parsed - value).abs() <= 0.001 / 60.0 + 1e-9);
        }

        #[test]
        fn prop_hemisphere_follows_sign(value in -180.0f64..=180.0) {
            let expected = if value < 0.0 { 'W' } else { 'E' };
            prop_assert_eq!(encode_longitude(value).hemisphere, expected);
        }
    }
}
