/// A rectangle in CSS px units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Edges inclusive.
    pub fn contains(&self, (x, y): (f32, f32)) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn expanded_by(&self, edges: Edges) -> Rect {
        Rect {
            x: self.x - edges.left,
            y: self.y - edges.top,
            width: self.width + edges.left + edges.right,
            height: self.height + edges.top + edges.bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Content rect plus the three edge rings around it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxModel {
    pub content: Rect,
    pub padding: Edges,
    pub border: Edges,
    pub margin: Edges,
}

impl BoxModel {
    pub fn padding_box(&self) -> Rect {
        self.content.expanded_by(self.padding)
    }

    pub fn border_box(&self) -> Rect {
        self.padding_box().expanded_by(self.border)
    }

    pub fn margin_box(&self) -> Rect {
        self.border_box().expanded_by(self.margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_nest_outward() {
        let edges = |v: f32| Edges {
            top: v,
            right: v,
            bottom: v,
            left: v,
        };
        let model = BoxModel {
            content: Rect::new(20.0, 20.0, 100.0, 50.0),
            padding: edges(5.0),
            border: edges(1.0),
            margin: edges(10.0),
        };
        assert_eq!(model.padding_box(), Rect::new(15.0, 15.0, 110.0, 60.0));
        assert_eq!(model.border_box(), Rect::new(14.0, 14.0, 112.0, 62.0));
        assert_eq!(model.margin_box(), Rect::new(4.0, 4.0, 132.0, 82.0));
        assert!(model.content.contains((120.0, 70.0)));
        assert!(!model.content.contains((120.1, 70.0)));
    }
}
