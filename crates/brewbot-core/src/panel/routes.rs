//! Request routing for the control page and its endpoints

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    ToggleLed,
    MoveServo,
    GetDistance,
    CheckWater,
    MakeCoffee,
    Stats,
}

impl Route {
    /// Match a request target; anything after `?` is ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        match path {
            "/" => Some(Self::Index),
            "/toggle_led" => Some(Self::ToggleLed),
            "/move_servo" => Some(Self::MoveServo),
            "/get_distance" => Some(Self::GetDistance),
            "/check_water" => Some(Self::CheckWater),
            "/make_coffee" => Some(Self::MakeCoffee),
            "/stats" => Some(Self::Stats),
            _ => None,
        }
    }

    pub const fn method(self) -> Method {
        match self {
            Self::Index | Self::Stats => Method::Get,
            _ => Method::Post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_resolves() {
        let table = [
            ("/", Route::Index, Method::Get),
            ("/toggle_led", Route::ToggleLed, Method::Post),
            ("/move_servo", Route::MoveServo, Method::Post),
            ("/get_distance", Route::GetDistance, Method::Post),
            ("/check_water", Route::CheckWater, Method::Post),
            ("/make_coffee", Route::MakeCoffee, Method::Post),
            ("/stats", Route::Stats, Method::Get),
        ];

        for (path, route, method) in table {
            assert_eq!(Route::from_path(path), Some(route), "{path}");
            assert_eq!(route.method(), method, "{path}");
        }
    }

    #[test]
    fn test_query_string_is_ignored() {
        assert_eq!(Route::from_path("/?v=2"), Some(Route::Index));
        assert_eq!(Route::from_path("/stats?"), Some(Route::Stats));
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(Route::from_path("/favicon.ico"), None);
        assert_eq!(Route::from_path("/toggle_led/"), None);
        assert_eq!(Route::from_path(""), None);
    }
}
