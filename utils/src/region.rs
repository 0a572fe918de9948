// Region tracking helpers
//
// Austin Shafer - 2020

use std::cmp::PartialOrd;
use std::ops::{Add, Sub};

/// A rectangular region
///
/// This is used to describe window rectangles and cursor clip
/// areas. It is determinined by the corners of a rectangle:
///   r_pos:  the upper left corner's position on the desktop
///   r_size: the distance from the left to the lower right
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Rect<T: PartialOrd + Copy + Add<Output = T> + Sub<Output = T>> {
    pub r_pos: (T, T),
    pub r_size: (T, T),
}

impl<T: PartialOrd + Copy + Add<Output = T> + Sub<Output = T>> Rect<T> {
    pub fn new(x: T, y: T, width: T, height: T) -> Rect<T> {
        Rect {
            r_pos: (x, y),
            r_size: (width, height),
        }
    }

    /// Build a rect from its edges: left, top, right, bottom
    pub fn from_edges(left: T, top: T, right: T, bottom: T) -> Rect<T> {
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn left(&self) -> T {
        self.r_pos.0
    }
    pub fn top(&self) -> T {
        self.r_pos.1
    }
    pub fn right(&self) -> T {
        self.r_pos.0 + self.r_size.0
    }
    pub fn bottom(&self) -> T {
        self.r_pos.1 + self.r_size.1
    }

    /// Checks if the point (x,y) is contained within this
    /// Rectangle.
    pub fn intersects(&self, x: T, y: T) -> bool {
        x > self.r_pos.0
            && y > self.r_pos.1
            && x < self.right()
            && y < self.bottom()
    }

    /// True if any edge of this rect lies inside `outer`, i.e. this
    /// rect does not cover all of `outer`.
    pub fn shrinks(&self, outer: &Rect<T>) -> bool {
        self.left() > outer.left()
            || self.right() < outer.right()
            || self.top() > outer.top()
            || self.bottom() < outer.bottom()
    }
}
